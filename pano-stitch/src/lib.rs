//! Composites two images related by a homography into one cropped panorama.
//!
//! The canvas is sized conservatively (sum of widths by maximum height), the
//! source image is warped in by inverse mapping with bilinear sampling, the
//! target image is painted over it at the origin, and the result is cropped
//! to the tightest rectangle containing foreground.
//!
//! Known simplification: the target image always lands at the canvas origin;
//! no translation is recovered from the homography. Pairs whose target
//! content should appear offset within the combined canvas come out wrong,
//! which is inherited from the pipeline this reproduces and is not silently
//! corrected here.

use image::{Pixel, Rgb, RgbImage};
use log::*;
use pano_core::{nalgebra::Point2, Error, Homography};

/// An axis-aligned rectangle in canvas pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Composites a warped source image and an origin-anchored target image.
#[derive(Debug, Clone, Copy)]
pub struct Stitcher {
    /// Luma values strictly above this count as foreground when cropping.
    ///
    /// Zero reproduces the historical `> 0` cutoff, which misclassifies
    /// legitimately pure-black content as background; callers with dark
    /// imagery should tune this rather than rely on the default.
    pub crop_threshold: u8,
}

impl Default for Stitcher {
    fn default() -> Self {
        Self { crop_threshold: 0 }
    }
}

impl Stitcher {
    pub fn new(crop_threshold: u8) -> Self {
        Self { crop_threshold }
    }

    /// Warps `source` into `target`'s plane through `homography` and
    /// composites both onto one canvas, cropped to its foreground.
    ///
    /// The target image overwrites warped source content wherever they
    /// overlap; no blending is performed. A canvas with no foreground at all
    /// is returned uncropped.
    ///
    /// Fails with [`Error::InvalidParameter`] when either image has a zero
    /// dimension or the homography is not invertible, before any painting.
    pub fn stitch(
        &self,
        source: &RgbImage,
        target: &RgbImage,
        homography: &Homography,
    ) -> Result<RgbImage, Error> {
        let smallest_extent = source
            .width()
            .min(source.height())
            .min(target.width())
            .min(target.height());
        if smallest_extent == 0 {
            return Err(Error::InvalidParameter {
                name: "image dimensions",
                value: 0.0,
                constraint: "positive in both axes for both images",
            });
        }
        let inverse = homography.try_inverse().ok_or(Error::InvalidParameter {
            name: "homography",
            value: homography.0.determinant(),
            constraint: "an invertible matrix",
        })?;

        // A conservative bound that always contains the union after warping;
        // the final crop recovers tightness.
        let width = source.width() + target.width();
        let height = source.height().max(target.height());
        let mut canvas = RgbImage::new(width, height);

        warp_into(source, &inverse, &mut canvas);
        for (x, y, pixel) in target.enumerate_pixels() {
            canvas.put_pixel(x, y, *pixel);
        }

        match foreground_rect(&canvas, self.crop_threshold) {
            Some(rect) => {
                debug!(
                    "cropping {}x{} canvas to {}x{}+{}+{}",
                    width, height, rect.width, rect.height, rect.x, rect.y
                );
                Ok(crop(&canvas, rect))
            }
            None => {
                warn!("no foreground above luma {}, returning uncropped canvas", self.crop_threshold);
                Ok(canvas)
            }
        }
    }
}

/// Paints `source` into `canvas` by inverse mapping: each canvas pixel is
/// pulled from the source through the inverted homography with bilinear
/// sampling, and pixels mapping outside the source keep their background
/// value.
pub fn warp_into(source: &RgbImage, inverse: &Homography, canvas: &mut RgbImage) {
    for y in 0..canvas.height() {
        for x in 0..canvas.width() {
            let p = inverse.transform(Point2::new(x as f64, y as f64));
            if let Some(pixel) = sample_bilinear(source, p.x, p.y) {
                canvas.put_pixel(x, y, pixel);
            }
        }
    }
}

/// Bilinear sample at fractional coordinates, `None` outside the image.
fn sample_bilinear(image: &RgbImage, x: f64, y: f64) -> Option<Rgb<u8>> {
    let (width, height) = image.dimensions();
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    if x < 0.0 || y < 0.0 || x > (width - 1) as f64 || y > (height - 1) as f64 {
        return None;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let mut channels = [0u8; 3];
    for (c, channel) in channels.iter_mut().enumerate() {
        let top_left = image.get_pixel(x0, y0)[c] as f64;
        let top_right = image.get_pixel(x1, y0)[c] as f64;
        let bottom_left = image.get_pixel(x0, y1)[c] as f64;
        let bottom_right = image.get_pixel(x1, y1)[c] as f64;
        let top = top_left + (top_right - top_left) * fx;
        let bottom = bottom_left + (bottom_right - bottom_left) * fx;
        *channel = (top + (bottom - top) * fy).round() as u8;
    }
    Some(Rgb(channels))
}

/// The tightest rectangle containing every pixel whose luma exceeds
/// `threshold`, or `None` when the whole canvas is background.
pub fn foreground_rect(canvas: &RgbImage, threshold: u8) -> Option<Rect> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;
    for (x, y, pixel) in canvas.enumerate_pixels() {
        if pixel.to_luma()[0] > threshold {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            found = true;
        }
    }
    found.then(|| Rect {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

fn crop(canvas: &RgbImage, rect: Rect) -> RgbImage {
    image::imageops::crop_imm(canvas, rect.x, rect.y, rect.width, rect.height).to_image()
}
