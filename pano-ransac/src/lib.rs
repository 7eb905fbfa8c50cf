//! Random sample consensus with a fixed iteration budget.
//!
//! [`Ransac`] implements [`Consensus`] over any minimal-sample
//! [`Estimator`], repeatedly fitting models to random minimal subsets and
//! keeping the fit with the largest supporting inlier set. The random source
//! is supplied by the caller, never taken from a process global, so seeding
//! the generator identically reproduces the run exactly.
//!
//! [`HomographyEstimator`] wires [`Ransac`] to the four-point direct linear
//! transform and translates the outcome into the pipeline error taxonomy.

mod homography;

pub use homography::HomographyEstimator;

use log::*;
use pano_core::sample_consensus::{Consensus, Estimator, Model};
use rand::seq::index;
use rand::Rng;

/// Classic RANSAC.
///
/// Runs for a fixed number of iterations rather than until success, so the
/// worst-case cost is deterministic. Every draw consumes an iteration, even
/// when the estimator rejects the sample as degenerate; data where every
/// sample is degenerate therefore still terminates, with no consensus.
///
/// Candidate models are ranked by inlier count, ties broken by the lower
/// total residual over their inliers. After the budget is spent, the best
/// model is refit over its entire inlier set to shed minimal-sample noise,
/// and the refit is kept only when it does not lose consensus. The reported
/// inliers are always recomputed against the model that is returned.
#[derive(Debug)]
pub struct Ransac<R> {
    /// Fixed iteration budget.
    pub max_iterations: usize,
    /// Residuals strictly below this are inliers.
    pub inlier_threshold: f64,
    rng: R,
    best_count: usize,
}

impl<R> Ransac<R>
where
    R: Rng,
{
    pub fn new(inlier_threshold: f64, rng: R) -> Self {
        Self {
            max_iterations: 1000,
            inlier_threshold,
            rng,
            best_count: 0,
        }
    }

    /// Overrides the iteration budget.
    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..self
        }
    }

    /// The inlier count of the best sample from the most recent run, kept
    /// even when that run produced no consensus.
    pub fn best_inlier_count(&self) -> usize {
        self.best_count
    }
}

/// Indices and total residual of the data supporting `model`.
fn consensus_inliers<Data, M: Model<Data>>(
    model: &M,
    data: &[Data],
    threshold: f64,
) -> (Vec<usize>, f64) {
    let mut inliers = Vec::new();
    let mut total_residual = 0.0;
    for (ix, datum) in data.iter().enumerate() {
        let residual = model.residual(datum);
        if residual < threshold {
            inliers.push(ix);
            total_residual += residual;
        }
    }
    (inliers, total_residual)
}

impl<E, R, Data> Consensus<E, Data> for Ransac<R>
where
    E: Estimator<Data>,
    E::Model: Model<Data>,
    R: Rng,
    Data: Clone,
{
    type Inliers = Vec<usize>;

    fn model<I>(&mut self, estimator: &E, data: I) -> Option<E::Model>
    where
        I: Iterator<Item = Data> + Clone,
    {
        self.model_inliers(estimator, data).map(|(model, _)| model)
    }

    fn model_inliers<I>(&mut self, estimator: &E, data: I) -> Option<(E::Model, Self::Inliers)>
    where
        I: Iterator<Item = Data> + Clone,
    {
        let data: Vec<Data> = data.collect();
        self.best_count = 0;
        if data.len() < E::MIN_SAMPLES {
            return None;
        }

        let mut best: Option<(E::Model, Vec<usize>, f64)> = None;
        for _ in 0..self.max_iterations {
            let sample_indices = index::sample(&mut self.rng, data.len(), E::MIN_SAMPLES);
            let sample: Vec<Data> = sample_indices.iter().map(|ix| data[ix].clone()).collect();
            for model in estimator.estimate(sample.iter().cloned()) {
                let (inliers, total_residual) =
                    consensus_inliers(&model, &data, self.inlier_threshold);
                let improves = match &best {
                    None => true,
                    Some((_, best_inliers, best_residual)) => {
                        inliers.len() > best_inliers.len()
                            || (inliers.len() == best_inliers.len()
                                && total_residual < *best_residual)
                    }
                };
                if improves {
                    best = Some((model, inliers, total_residual));
                }
            }
        }

        let (mut model, mut inliers, mut total_residual) = best?;
        self.best_count = inliers.len();
        if inliers.len() < E::MIN_SAMPLES {
            return None;
        }

        // Refit over the whole consensus set; a homography fit to all inliers
        // in a least-squares sense is less noisy than one fit to the seed
        // sample alone.
        for refit in estimator.estimate(inliers.iter().map(|&ix| data[ix].clone())) {
            let (refit_inliers, refit_residual) =
                consensus_inliers(&refit, &data, self.inlier_threshold);
            if refit_inliers.len() > inliers.len()
                || (refit_inliers.len() == inliers.len() && refit_residual <= total_residual)
            {
                model = refit;
                inliers = refit_inliers;
                total_residual = refit_residual;
            }
        }
        self.best_count = inliers.len();
        debug!(
            "consensus of {} inliers from {} data (threshold {})",
            inliers.len(),
            data.len(),
            self.inlier_threshold
        );
        Some((model, inliers))
    }
}
