//! # `pano-core`
//!
//! This library provides the common types shared by the feature-matching and
//! panorama-stitching crates. Everything that crosses a crate boundary in the
//! pipeline lives here: keypoints, descriptors, correspondences, homographies,
//! and the error taxonomy. The crate is deliberately small so that matcher,
//! estimator, and compositor crates can interoperate without depending on one
//! another.
//!
//! The detector that produces keypoints and descriptors is treated as an
//! external capability. Convert its output into [`KeyPoint`] and
//! [`Descriptor`] once at the boundary; from then on the pipeline owns plain
//! data with no hidden coupling to the detector's internal state.

mod descriptor;
mod error;
mod homography;
mod keypoint;
mod matches;

pub use descriptor::{Descriptor, Euclidean};
pub use error::Error;
pub use homography::Homography;
pub use keypoint::{ImagePoint, KeyPoint};
pub use matches::{Correspondence, FeatureMatch};

pub use nalgebra;
pub use sample_consensus;
