use crate::Ransac;
use four_point::FourPoint;
use pano_core::{
    sample_consensus::{Consensus, Estimator},
    Error, FeatureMatch, Homography,
};
use rand::Rng;

/// Robust homography estimation over ratio-filtered correspondences.
///
/// Wraps [`Ransac`] around [`FourPoint`], validates parameters before any
/// computation, and reports failures through the pipeline error taxonomy.
/// The returned mask is parallel to the input matches and marks the
/// consensus inliers of the returned homography; the homography is only
/// statistically meaningful together with that mask.
#[derive(Debug, Clone, Copy)]
pub struct HomographyEstimator {
    /// Reprojection error below which a correspondence is an inlier, in
    /// pixels of the original (unrescaled) target coordinate system.
    pub reproj_threshold: f64,
    /// Fixed consensus iteration budget.
    pub max_iterations: usize,
}

impl HomographyEstimator {
    /// Creates an estimator with the given reprojection threshold and the
    /// default iteration budget.
    pub fn new(reproj_threshold: f64) -> Self {
        Self {
            reproj_threshold,
            ..Default::default()
        }
    }

    /// Finds the homography best supported by the matches.
    ///
    /// Results are deterministic for a given `rng` seed. Fails with
    /// [`Error::InvalidParameter`] for a non-positive threshold,
    /// [`Error::InsufficientCorrespondences`] for fewer than four matches
    /// (insufficient geometry, not a fatal condition), and
    /// [`Error::DegenerateGeometry`] when no four-inlier consensus exists.
    pub fn estimate<R: Rng>(
        &self,
        matches: &[FeatureMatch],
        rng: R,
    ) -> Result<(Homography, Vec<bool>), Error> {
        if !(self.reproj_threshold > 0.0) {
            return Err(Error::InvalidParameter {
                name: "reproj_threshold",
                value: self.reproj_threshold,
                constraint: "greater than zero",
            });
        }
        let required = <FourPoint as Estimator<FeatureMatch>>::MIN_SAMPLES;
        if matches.len() < required {
            return Err(Error::InsufficientCorrespondences {
                found: matches.len(),
                required,
            });
        }

        let mut ransac =
            Ransac::new(self.reproj_threshold, rng).max_iterations(self.max_iterations);
        match ransac.model_inliers(&FourPoint::new(), matches.iter().copied()) {
            Some((homography, inliers)) => {
                let mut mask = vec![false; matches.len()];
                for ix in inliers {
                    mask[ix] = true;
                }
                Ok((homography, mask))
            }
            None => Err(Error::DegenerateGeometry {
                inliers: ransac.best_inlier_count(),
                required,
                iterations: self.max_iterations,
            }),
        }
    }
}

impl Default for HomographyEstimator {
    fn default() -> Self {
        Self {
            reproj_threshold: 5.0,
            max_iterations: 1000,
        }
    }
}
