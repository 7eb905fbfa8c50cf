use nalgebra::Point2;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Pixel-coordinate keypoint match consumed by model estimation.
///
/// The first point lies on the source image plane and the second on the
/// target image plane.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct FeatureMatch(pub Point2<f64>, pub Point2<f64>);

/// An accepted nearest-neighbor match between two descriptor sets.
///
/// Produced by the matcher under best-match-only semantics: each `source`
/// index appears in at most one correspondence. The runner-up distance is
/// retained so consumers can audit the ratio-test margin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Correspondence {
    /// Index into the source keypoint/descriptor set.
    pub source: usize,
    /// Index into the target keypoint/descriptor set.
    pub target: usize,
    /// Distance of the best match.
    pub distance: f32,
    /// Distance of the second-best match for the same source descriptor.
    pub second_distance: f32,
}
