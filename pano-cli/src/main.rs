use akaze::Akaze;
use bitarray::BitArray;
use image::{DynamicImage, GenericImageView, ImageOutputFormat, Rgba, RgbaImage};
use imageproc::{drawing, pixelops};
use itertools::Itertools;
use log::*;
use palette::{FromColor, Hsv, RgbHue, Srgb};
use pano::{
    consensus::HomographyEstimator,
    matching::RatioMatcher,
    nalgebra::Point2,
    stitch::Stitcher,
    Correspondence, Descriptor, FeatureMatch, KeyPoint,
};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Serialize;
use std::path::PathBuf;
use structopt::StructOpt;

/// AKAZE's binary descriptors are 486 bits stored in 64 bytes; each bit
/// becomes one 0/1 float, under which Euclidean distance is the square root
/// of the Hamming distance and nearest-neighbor order is preserved.
const DESCRIPTOR_LEN: usize = 512;

#[derive(Debug, StructOpt)]
#[structopt(name = "pano", about = "Feature matching and panorama stitching tools")]
enum Opt {
    /// Match features between two images, visualize the verified matches,
    /// and optionally export the match report and homography as JSON.
    Match(MatchOpt),
    /// Stitch two images into a cropped panorama.
    Stitch(StitchOpt),
}

#[derive(Debug, StructOpt)]
struct MatchOpt {
    /// Lowe's ratio threshold for accepting a nearest-neighbor match.
    #[structopt(short, long, default_value = "0.75")]
    ratio: f32,
    /// RANSAC reprojection threshold in pixels.
    #[structopt(short = "t", long, default_value = "5.0")]
    reproj_thresh: f64,
    /// Maximum number of matches to draw (0 = all).
    #[structopt(short, long, default_value = "0")]
    max_matches: usize,
    /// The akaze detector threshold to use.
    ///
    /// 0.01 will be very sparse and 0.0001 will be very dense.
    #[structopt(long, default_value = "0.001")]
    threshold: f64,
    /// Seed for the consensus random sampler; identical seeds reproduce runs.
    #[structopt(long, default_value = "0")]
    seed: u64,
    /// The output path for the match visualization (image type from extension).
    ///
    /// If this is not provided, then the output goes to stdout as a PNG.
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
    /// Write the kept correspondences as JSON rows of
    /// `{source, target, distance}`.
    #[structopt(long, parse(from_os_str))]
    matches_out: Option<PathBuf>,
    /// Write the estimated homography (row-major) and inlier mask as JSON.
    #[structopt(long, parse(from_os_str))]
    homography_out: Option<PathBuf>,
    /// The first input image.
    #[structopt(parse(from_os_str))]
    image1: PathBuf,
    /// The second input image.
    #[structopt(parse(from_os_str))]
    image2: PathBuf,
}

#[derive(Debug, StructOpt)]
struct StitchOpt {
    /// Lowe's ratio threshold for accepting a nearest-neighbor match.
    #[structopt(short, long, default_value = "0.75")]
    ratio: f32,
    /// RANSAC reprojection threshold in pixels.
    #[structopt(short = "t", long, default_value = "5.0")]
    reproj_thresh: f64,
    /// Luma values above this count as foreground when cropping the canvas.
    #[structopt(long, default_value = "0")]
    crop_threshold: u8,
    /// The akaze detector threshold to use.
    #[structopt(long, default_value = "0.001")]
    threshold: f64,
    /// Seed for the consensus random sampler; identical seeds reproduce runs.
    #[structopt(long, default_value = "0")]
    seed: u64,
    /// Directory to save output files.
    #[structopt(long, default_value = "stitch-out", parse(from_os_str))]
    out_dir: PathBuf,
    /// Output panorama filename inside the output directory.
    #[structopt(long, default_value = "panorama.png")]
    out_image: String,
    /// The first input image, warped into the second image's plane.
    #[structopt(parse(from_os_str))]
    image1: PathBuf,
    /// The second input image, anchored at the panorama origin.
    #[structopt(parse(from_os_str))]
    image2: PathBuf,
}

#[derive(Serialize)]
struct MatchRecord {
    source: usize,
    target: usize,
    distance: f32,
}

#[derive(Serialize)]
struct HomographyArtifact {
    /// Row-major 3×3 matrix entries.
    homography: [f64; 9],
    /// Parallel to the exported match rows.
    inliers: Vec<bool>,
}

fn main() {
    pretty_env_logger::init_timed();
    let result = match Opt::from_args() {
        Opt::Match(opt) => run_match(opt),
        Opt::Stitch(opt) => run_stitch(opt),
    };
    if let Err(error) = result {
        eprintln!("error: {}", error);
        std::process::exit(1);
    }
}

fn run_match(opt: MatchOpt) -> Result<(), Box<dyn std::error::Error>> {
    let image_a = image::open(&opt.image1)?;
    let image_b = image::open(&opt.image2)?;

    let (keypoints_a, descriptors_a) = detect(&image_a, opt.threshold);
    let (keypoints_b, descriptors_b) = detect(&image_b, opt.threshold);
    info!(
        "extracted {} and {} descriptors",
        descriptors_a.len(),
        descriptors_b.len()
    );

    let correspondences =
        RatioMatcher::new(opt.ratio).matches(&descriptors_a, &descriptors_b)?;
    info!("{} correspondences passed the ratio test", correspondences.len());

    let matches = positional_matches(&keypoints_a, &keypoints_b, &correspondences);
    let (homography, mask) = HomographyEstimator::new(opt.reproj_thresh)
        .estimate(&matches, Xoshiro256PlusPlus::seed_from_u64(opt.seed))?;
    info!(
        "consensus kept {} of {} correspondences",
        mask.iter().filter(|&&inlier| inlier).count(),
        mask.len()
    );

    if let Some(path) = &opt.matches_out {
        let records: Vec<MatchRecord> = correspondences
            .iter()
            .map(|c| MatchRecord {
                source: c.source,
                target: c.target,
                distance: c.distance,
            })
            .collect();
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &records)?;
    }
    if let Some(path) = &opt.homography_out {
        let artifact = HomographyArtifact {
            homography: homography.to_row_major(),
            inliers: mask.clone(),
        };
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &artifact)?;
    }

    let canvas = draw_matches(
        &image_a,
        &image_b,
        &keypoints_a,
        &keypoints_b,
        &correspondences,
        &mask,
        opt.max_matches,
    );
    let canvas = DynamicImage::ImageRgba8(canvas);
    if let Some(path) = &opt.output {
        canvas.save(path)?;
    } else {
        let mut buffer = std::io::Cursor::new(Vec::new());
        canvas.write_to(&mut buffer, ImageOutputFormat::Png)?;
        let stdout = std::io::stdout();
        std::io::Write::write_all(&mut stdout.lock(), buffer.get_ref())?;
    }
    Ok(())
}

fn run_stitch(opt: StitchOpt) -> Result<(), Box<dyn std::error::Error>> {
    let image_a = image::open(&opt.image1)?;
    let image_b = image::open(&opt.image2)?;

    let (keypoints_a, descriptors_a) = detect(&image_a, opt.threshold);
    let (keypoints_b, descriptors_b) = detect(&image_b, opt.threshold);
    info!(
        "extracted {} and {} descriptors",
        descriptors_a.len(),
        descriptors_b.len()
    );

    let correspondences =
        RatioMatcher::new(opt.ratio).matches(&descriptors_a, &descriptors_b)?;
    info!("{} correspondences passed the ratio test", correspondences.len());

    let matches = positional_matches(&keypoints_a, &keypoints_b, &correspondences);
    let (homography, mask) = HomographyEstimator::new(opt.reproj_thresh)
        .estimate(&matches, Xoshiro256PlusPlus::seed_from_u64(opt.seed))?;
    info!(
        "consensus kept {} of {} correspondences",
        mask.iter().filter(|&&inlier| inlier).count(),
        mask.len()
    );

    let panorama = Stitcher::new(opt.crop_threshold).stitch(
        &image_a.to_rgb8(),
        &image_b.to_rgb8(),
        &homography,
    )?;

    std::fs::create_dir_all(&opt.out_dir)?;
    let out_path = opt.out_dir.join(&opt.out_image);
    panorama.save(&out_path)?;
    println!("panorama saved to {}", out_path.display());
    Ok(())
}

/// Extracts AKAZE features and converts them into the pipeline's detector
/// boundary types once; everything downstream owns plain data.
fn detect(image: &DynamicImage, threshold: f64) -> (Vec<KeyPoint>, Vec<Descriptor<DESCRIPTOR_LEN>>) {
    let (keypoints, descriptors) = Akaze::new(threshold).extract(image);
    let keypoints = keypoints
        .iter()
        .map(|kp| KeyPoint {
            point: Point2::new(kp.point.0 as f64, kp.point.1 as f64),
            response: kp.response,
            size: kp.size,
            angle: kp.angle,
        })
        .collect();
    let descriptors = descriptors.iter().map(float_descriptor).collect();
    (keypoints, descriptors)
}

fn float_descriptor(bits: &BitArray<64>) -> Descriptor<DESCRIPTOR_LEN> {
    let mut values = [0.0f32; DESCRIPTOR_LEN];
    for (ix, value) in values.iter_mut().enumerate() {
        if bits.bytes()[ix / 8] >> (ix % 8) & 1 != 0 {
            *value = 1.0;
        }
    }
    Descriptor(values)
}

fn positional_matches(
    keypoints_a: &[KeyPoint],
    keypoints_b: &[KeyPoint],
    correspondences: &[Correspondence],
) -> Vec<FeatureMatch> {
    correspondences
        .iter()
        .map(|c| FeatureMatch(keypoints_a[c.source].point, keypoints_b[c.target].point))
        .collect()
}

/// Renders both images side by side and draws a line for every verified
/// match, colored by rotating through the most saturated hues.
fn draw_matches(
    image_a: &DynamicImage,
    image_b: &DynamicImage,
    keypoints_a: &[KeyPoint],
    keypoints_b: &[KeyPoint],
    correspondences: &[Correspondence],
    mask: &[bool],
    max_matches: usize,
) -> RgbaImage {
    let canvas_width = image_a.dimensions().0 + image_b.dimensions().0;
    let canvas_height = std::cmp::max(image_a.dimensions().1, image_b.dimensions().1);
    let rgba_a = image_a.to_rgba8();
    let rgba_b = image_b.to_rgba8();
    let mut canvas = RgbaImage::from_pixel(canvas_width, canvas_height, Rgba([0, 0, 0, 255]));

    let mut render_at_x_offset = |image: &RgbaImage, x_offset: u32| {
        let (width, height) = image.dimensions();
        for (x, y) in (0..width).cartesian_product(0..height) {
            canvas.put_pixel(x + x_offset, y, *image.get_pixel(x, y));
        }
    };
    render_at_x_offset(&rgba_a, 0);
    render_at_x_offset(&rgba_b, rgba_a.dimensions().0);

    let limit = if max_matches == 0 {
        usize::MAX
    } else {
        max_matches
    };
    let inliers = correspondences
        .iter()
        .zip(mask.iter())
        .filter(|&(_, &inlier)| inlier)
        .take(limit);
    for (ix, (correspondence, _)) in inliers.enumerate() {
        let hsv = Hsv::new(RgbHue::from_radians(ix as f64 * 0.1), 1.0, 1.0);
        let rgb = Srgb::from_color(hsv);
        let a = keypoints_a[correspondence.source].point;
        let b = keypoints_b[correspondence.target].point;
        drawing::draw_antialiased_line_segment_mut(
            &mut canvas,
            (a.x as i32, a.y as i32),
            (b.x as i32 + rgba_a.dimensions().0 as i32, b.y as i32),
            Rgba([
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
                255,
            ]),
            pixelops::interpolate,
        );
    }
    canvas
}
