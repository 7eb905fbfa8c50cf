//! # `pano`
//!
//! Batteries-included re-exports for the feature-matching and
//! panorama-stitching pipeline. This crate is useful for quickly wiring the
//! whole pipeline in one place; production applications should import the
//! individual crates instead so they only pull in what they use.
//!
//! The pipeline flows strictly left to right, and no stage depends on its
//! successor:
//!
//! ```text
//! detector -> matcher -> estimator -> compositor
//! ```
//!
//! * [`knn`] - searching for nearest neighbors in descriptor sets
//! * [`matching`] - turning two descriptor sets into filtered correspondences
//! * [`consensus`] - robustly fitting a homography to contaminated matches
//! * [`estimate`] - the minimal/least-squares homography estimator itself
//! * [`stitch`] - compositing two images with a fitted homography

pub use pano_core::{sample_consensus::*, *};

pub use space::Metric;

/// Searching for nearest neighbors in descriptor sets
pub mod knn {
    pub use space::{Knn, LinearKnn, Metric, Neighbor};
}

/// Correspondence matching
pub mod matching {
    pub use pano_match::RatioMatcher;
}

/// Consensus algorithms (RANSAC)
pub mod consensus {
    pub use pano_ransac::{HomographyEstimator, Ransac};
}

/// Estimation of models from data
pub mod estimate {
    pub use four_point::FourPoint;
}

/// Panorama compositing
pub mod stitch {
    pub use pano_stitch::{foreground_rect, warp_into, Rect, Stitcher};
}
