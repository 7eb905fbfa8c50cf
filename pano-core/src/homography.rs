use crate::FeatureMatch;
use derive_more::{AsMut, AsRef, From, Into};
use nalgebra::{Matrix3, Point2, Vector3};
use sample_consensus::Model;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A scale-normalized 3×3 planar projective transform.
///
/// Maps homogeneous source-image coordinates onto the target image plane.
/// A homography has eight degrees of freedom; the matrix is kept normalized
/// so the bottom-right entry is one, or to unit Frobenius norm when that
/// entry is numerically zero.
///
/// A homography produced by consensus estimation is only statistically
/// meaningful together with the inlier mask that justified it.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Homography(pub Matrix3<f64>);

impl Homography {
    /// The identity transform.
    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    /// Maps a source-plane point onto the target plane, performing the
    /// perspective divide.
    ///
    /// Points on the line at infinity of the transform divide by a vanishing
    /// homogeneous coordinate and map to non-finite coordinates, which every
    /// downstream consumer treats as out of bounds.
    pub fn transform(&self, point: Point2<f64>) -> Point2<f64> {
        let p = self.0 * Vector3::new(point.x, point.y, 1.0);
        Point2::new(p.x / p.z, p.y / p.z)
    }

    /// Rescales the matrix so the bottom-right entry is one, falling back to
    /// unit Frobenius norm when that entry is numerically zero.
    pub fn normalize(self) -> Self {
        let scale = self.0[(2, 2)];
        if scale.abs() > 1e-12 {
            Self(self.0 / scale)
        } else {
            Self(self.0 / self.0.norm())
        }
    }

    /// The inverse transform, if the matrix is invertible.
    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// Euclidean distance on the target plane between the mapped source point
    /// and the observed target point, in pixels.
    pub fn reprojection_error(&self, data: &FeatureMatch) -> f64 {
        let &FeatureMatch(a, b) = data;
        nalgebra::distance(&self.transform(a), &b)
    }

    /// The nine matrix entries in row-major order, the layout used by the
    /// serialized estimator artifact.
    pub fn to_row_major(&self) -> [f64; 9] {
        let m = self.0;
        [
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 0)],
            m[(1, 1)],
            m[(1, 2)],
            m[(2, 0)],
            m[(2, 1)],
            m[(2, 2)],
        ]
    }

    /// Builds a homography from nine row-major entries.
    pub fn from_row_major(values: [f64; 9]) -> Self {
        Self(Matrix3::from_row_slice(&values))
    }
}

impl Model<FeatureMatch> for Homography {
    fn residual(&self, data: &FeatureMatch) -> f64 {
        self.reprojection_error(data)
    }
}
