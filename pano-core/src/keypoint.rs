use nalgebra::Point2;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Allows the retrieval of the point on the image the feature came from.
pub trait ImagePoint {
    /// Retrieves the point on the image
    fn image_point(&self) -> Point2<f64>;
}

/// A point of interest on an image frame, in pixel coordinates.
///
/// The detector metadata (`response`, `size`, `angle`) is carried through the
/// pipeline untouched; only `point` is interpreted by the matcher, estimator,
/// and compositor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KeyPoint {
    /// Position in the image, +x right and +y down from the top-left corner.
    pub point: Point2<f64>,
    /// The magnitude of response from the detector.
    pub response: f32,
    /// The radius defining the extent of the keypoint, in pixel units.
    pub size: f32,
    /// The orientation angle in radians.
    pub angle: f32,
}

impl KeyPoint {
    /// A keypoint at a position with no detector metadata.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            point: Point2::new(x, y),
            response: 0.0,
            size: 0.0,
            angle: 0.0,
        }
    }
}

impl ImagePoint for KeyPoint {
    fn image_point(&self) -> Point2<f64> {
        self.point
    }
}
