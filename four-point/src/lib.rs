//! Estimates a planar homography from point correspondences with the
//! [direct linear transform](https://en.wikipedia.org/wiki/Direct_linear_transformation)
//! described by Hartley and Zisserman.
//!
//! Four correspondences give the eight equations needed to determine the
//! eight degrees of freedom, so [`FourPoint`] works as the minimal-sample
//! estimator inside a consensus process. [`FourPoint::from_matches`] also
//! accepts any larger set and solves it in a least-squares sense, which is
//! how consensus refits over a full inlier set.

use arrayvec::ArrayVec;
use float_ord::FloatOrd;
use pano_core::{
    nalgebra::{DMatrix, Matrix3, Point2, Vector2},
    sample_consensus::Estimator,
    FeatureMatch, Homography,
};
use std::f64::consts::SQRT_2;

/// A Hartley normalization pair: `forward` maps points so their centroid is
/// the origin and their mean distance from it is √2, and `inverse` undoes it.
fn normalizing_transform(points: &[Point2<f64>]) -> (Matrix3<f64>, Matrix3<f64>) {
    let n = points.len() as f64;
    let centroid = points.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / n;
    let mean_distance = points
        .iter()
        .map(|p| (p.coords - centroid).norm())
        .sum::<f64>()
        / n;
    let scale = if mean_distance > 0.0 {
        SQRT_2 / mean_distance
    } else {
        1.0
    };
    let forward = Matrix3::new(
        scale,
        0.0,
        -scale * centroid.x,
        0.0,
        scale,
        -scale * centroid.y,
        0.0,
        0.0,
        1.0,
    );
    let inverse = Matrix3::new(
        scale.recip(),
        0.0,
        centroid.x,
        0.0,
        scale.recip(),
        centroid.y,
        0.0,
        0.0,
        1.0,
    );
    (forward, inverse)
}

/// Whether any three of the four points span less than `threshold` doubled
/// triangle area. Such a sample cannot determine a unique homography.
fn has_collinear_triple(points: &[Point2<f64>; 4], threshold: f64) -> bool {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().any(|&[i, j, k]| {
        let ab = points[j] - points[i];
        let ac = points[k] - points[i];
        (ab.x * ac.y - ab.y * ac.x).abs() < threshold
    })
}

/// The four-point direct linear transform.
///
/// `epsilon` and `iterations` bound the symmetric eigendecomposition used to
/// extract the null space, in the same way the eigen solve of other minimal
/// estimators is bounded.
#[derive(Copy, Clone, Debug)]
pub struct FourPoint {
    pub epsilon: f64,
    pub iterations: usize,
    /// Minimum doubled triangle area below which three points of a minimal
    /// sample are considered collinear and the sample is rejected.
    pub collinearity_threshold: f64,
}

impl FourPoint {
    pub fn new() -> Self {
        Default::default()
    }

    /// Least-squares DLT over four or more matches.
    ///
    /// Both point sets are Hartley-normalized before building the `2n×9`
    /// constraint system, keeping it well conditioned for pixel-scale
    /// coordinates; the returned homography maps the original coordinates.
    /// The null vector is taken as the eigenvector of AᵀA with the smallest
    /// eigenvalue.
    ///
    /// Returns `None` for fewer than four matches or when the eigen solve
    /// does not converge. No degeneracy check is applied here; callers on the
    /// minimal-sample path get that through [`Estimator::estimate`].
    pub fn from_matches<I>(&self, data: I) -> Option<Homography>
    where
        I: Iterator<Item = FeatureMatch> + Clone,
    {
        let sources: Vec<Point2<f64>> = data.clone().map(|FeatureMatch(a, _)| a).collect();
        let targets: Vec<Point2<f64>> = data.map(|FeatureMatch(_, b)| b).collect();
        if sources.len() < 4 {
            return None;
        }
        let (source_norm, _) = normalizing_transform(&sources);
        let (target_norm, target_denorm) = normalizing_transform(&targets);

        let mut system = DMatrix::<f64>::zeros(2 * sources.len(), 9);
        for (i, (a, b)) in sources.iter().zip(targets.iter()).enumerate() {
            let a = Homography(source_norm).transform(*a);
            let b = Homography(target_norm).transform(*b);
            let (x, y) = (a.x, a.y);
            let (u, v) = (b.x, b.y);
            let r = 2 * i;
            system[(r, 0)] = -x;
            system[(r, 1)] = -y;
            system[(r, 2)] = -1.0;
            system[(r, 6)] = u * x;
            system[(r, 7)] = u * y;
            system[(r, 8)] = u;
            system[(r + 1, 3)] = -x;
            system[(r + 1, 4)] = -y;
            system[(r + 1, 5)] = -1.0;
            system[(r + 1, 6)] = v * x;
            system[(r + 1, 7)] = v * y;
            system[(r + 1, 8)] = v;
        }

        let ata = system.transpose() * &system;
        let eigens = ata.try_symmetric_eigen(self.epsilon, self.iterations)?;
        let null_vector = eigens
            .eigenvalues
            .iter()
            .enumerate()
            .min_by_key(|&(_, &value)| FloatOrd(value))
            .map(|(ix, _)| eigens.eigenvectors.column(ix).into_owned())?;
        let normalized = Matrix3::from_row_slice(null_vector.as_slice());
        Some(Homography(target_denorm * normalized * source_norm).normalize())
    }
}

impl Default for FourPoint {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            iterations: 1000,
            collinearity_threshold: 1e-8,
        }
    }
}

impl Estimator<FeatureMatch> for FourPoint {
    type Model = Homography;
    type ModelIter = ArrayVec<Homography, 1>;
    const MIN_SAMPLES: usize = 4;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = FeatureMatch> + Clone,
    {
        let sample: ArrayVec<FeatureMatch, 4> = data.clone().take(4).collect();
        if sample.len() < 4 {
            return ArrayVec::new();
        }
        // Only a minimal sample can be made degenerate by one collinear
        // triple; larger sets remain overdetermined and go straight to the
        // least-squares path.
        if data.clone().count() == 4 {
            let sources = [sample[0].0, sample[1].0, sample[2].0, sample[3].0];
            let targets = [sample[0].1, sample[1].1, sample[2].1, sample[3].1];
            if has_collinear_triple(&sources, self.collinearity_threshold)
                || has_collinear_triple(&targets, self.collinearity_threshold)
            {
                return ArrayVec::new();
            }
        }
        self.from_matches(data).into_iter().collect()
    }
}
