use thiserror::Error;

/// Failure taxonomy of the matching and alignment pipeline.
///
/// None of these are retried inside the core. Every variant carries the
/// counts and thresholds the caller needs to decide whether to relax its
/// parameters and try again, and no failure is ever downgraded to a
/// degraded-but-successful result.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum Error {
    /// One or both detector outputs contained zero descriptors.
    #[error(
        "nothing to match: source produced {source_count} descriptors, target produced {target_count}"
    )]
    DescriptorAbsent {
        source_count: usize,
        target_count: usize,
    },
    /// Too few correspondences survived filtering to constrain the model.
    #[error("only {found} correspondences available, at least {required} required")]
    InsufficientCorrespondences { found: usize, required: usize },
    /// Consensus search exhausted its budget without a usable inlier set.
    ///
    /// Distinct from [`Error::InsufficientCorrespondences`]: enough
    /// correspondences existed, but they did not agree on any geometry
    /// (which includes the case where every sample was collinear).
    #[error(
        "degenerate geometry: best consensus had {inliers} inliers of {required} required after {iterations} iterations"
    )]
    DegenerateGeometry {
        inliers: usize,
        required: usize,
        iterations: usize,
    },
    /// A tuning parameter was outside its valid range.
    ///
    /// Rejected before any computation starts, leaving no partial state.
    #[error("invalid parameter {name} = {value}: must be {constraint}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        constraint: &'static str,
    },
}
