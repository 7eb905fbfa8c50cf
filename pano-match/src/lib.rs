//! Turns two unordered descriptor sets into a filtered list of candidate
//! point correspondences.
//!
//! For every source descriptor the two nearest target descriptors are found
//! by exact linear search, and the best is accepted only when it passes
//! Lowe's ratio test against the runner-up. This cheap local filter rejects
//! ambiguous matches before the much more expensive consensus stage sees
//! them, which matters because the consensus iteration budget is highly
//! sensitive to the outlier fraction.

use log::*;
use pano_core::{Correspondence, Descriptor, Error, Euclidean};
use space::{Knn, LinearKnn};

/// Matches descriptors by nearest-neighbor search filtered with Lowe's
/// ratio test.
///
/// A candidate is kept only if `distance_best < ratio * distance_second_best`,
/// rejecting matches where the best and second-best candidates are nearly
/// equidistant and the match is therefore not confidently unique. Decreasing
/// `ratio` strictly narrows the accepted set.
#[derive(Debug, Clone, Copy)]
pub struct RatioMatcher {
    /// The acceptance threshold, within `(0, 1]`.
    pub ratio: f32,
}

impl RatioMatcher {
    /// Creates a matcher with the given ratio threshold.
    pub fn new(ratio: f32) -> Self {
        Self { ratio }
    }

    /// Matches every source descriptor against the target set.
    ///
    /// The output follows the iteration order of `source` and contains each
    /// source index at most once. Source descriptors for which the target set
    /// offers fewer than two candidates cannot be ratio-tested and are
    /// excluded rather than reported as an error.
    ///
    /// Fails with [`Error::DescriptorAbsent`] when either set is empty and
    /// with [`Error::InvalidParameter`] when the ratio is outside `(0, 1]`,
    /// in both cases before any search is performed.
    pub fn matches<const N: usize>(
        &self,
        source: &[Descriptor<N>],
        target: &[Descriptor<N>],
    ) -> Result<Vec<Correspondence>, Error> {
        if !(self.ratio > 0.0 && self.ratio <= 1.0) {
            return Err(Error::InvalidParameter {
                name: "ratio",
                value: self.ratio as f64,
                constraint: "within (0, 1]",
            });
        }
        if source.is_empty() || target.is_empty() {
            return Err(Error::DescriptorAbsent {
                source_count: source.len(),
                target_count: target.len(),
            });
        }

        let search = LinearKnn {
            metric: Euclidean,
            iter: target.iter(),
        };
        let mut correspondences = Vec::new();
        for (index, descriptor) in source.iter().enumerate() {
            let neighbors = search.knn(descriptor, 2);
            if neighbors.len() < 2 {
                continue;
            }
            let distance = f32::from_bits(neighbors[0].distance);
            let second_distance = f32::from_bits(neighbors[1].distance);
            if distance < self.ratio * second_distance {
                correspondences.push(Correspondence {
                    source: index,
                    target: neighbors[0].index,
                    distance,
                    second_distance,
                });
            }
        }
        debug!(
            "ratio test kept {} of {} candidates at ratio {}",
            correspondences.len(),
            source.len(),
            self.ratio
        );
        Ok(correspondences)
    }
}

impl Default for RatioMatcher {
    fn default() -> Self {
        Self { ratio: 0.75 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptors(values: &[[f32; 2]]) -> Vec<Descriptor<2>> {
        values.iter().map(|&v| Descriptor(v)).collect()
    }

    #[test]
    fn unambiguous_match_is_kept() {
        let source = descriptors(&[[0.0, 0.0]]);
        let target = descriptors(&[[0.1, 0.0], [5.0, 5.0]]);
        let matches = RatioMatcher::default().matches(&source, &target).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].source, 0);
        assert_eq!(matches[0].target, 0);
        assert!(matches[0].distance < matches[0].second_distance);
    }

    #[test]
    fn ambiguous_match_is_rejected() {
        // Both targets are nearly equidistant from the source.
        let source = descriptors(&[[0.0, 0.0]]);
        let target = descriptors(&[[1.0, 0.0], [0.0, 1.01]]);
        let matches = RatioMatcher::default().matches(&source, &target).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn every_match_satisfies_the_ratio_test() {
        let source = descriptors(&[[0.0, 0.0], [3.0, 3.0], [9.0, 1.0], [2.0, 7.0]]);
        let target = descriptors(&[[0.2, 0.1], [3.1, 2.9], [8.0, 2.0], [4.0, 4.0]]);
        let matcher = RatioMatcher::default();
        let matches = matcher.matches(&source, &target).unwrap();
        for m in &matches {
            assert!(m.distance < matcher.ratio * m.second_distance);
        }
    }

    #[test]
    fn source_indices_are_unique_and_ordered() {
        let source = descriptors(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]);
        let target = descriptors(&[[0.0, 0.1], [1.0, 1.1], [2.0, 2.1], [50.0, 50.0]]);
        let matches = RatioMatcher::default().matches(&source, &target).unwrap();
        let sources: Vec<usize> = matches.iter().map(|m| m.source).collect();
        let mut deduped = sources.clone();
        deduped.dedup();
        assert_eq!(sources, deduped);
        assert!(sources.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn smaller_ratio_never_widens_the_set() {
        let source = descriptors(&[[0.0, 0.0], [3.0, 3.0], [9.0, 1.0], [2.0, 7.0]]);
        let target = descriptors(&[[0.2, 0.1], [3.1, 2.9], [8.0, 2.0], [4.0, 4.0], [1.0, 6.0]]);
        let mut previous = usize::MAX;
        for ratio in [1.0, 0.9, 0.75, 0.5, 0.25, 0.1] {
            let count = RatioMatcher::new(ratio)
                .matches(&source, &target)
                .unwrap()
                .len();
            assert!(count <= previous);
            previous = count;
        }
    }

    #[test]
    fn empty_sets_are_descriptor_absent() {
        let some = descriptors(&[[0.0, 0.0]]);
        let none: Vec<Descriptor<2>> = Vec::new();
        assert_eq!(
            RatioMatcher::default().matches(&none, &some),
            Err(Error::DescriptorAbsent {
                source_count: 0,
                target_count: 1
            })
        );
        assert_eq!(
            RatioMatcher::default().matches(&some, &none),
            Err(Error::DescriptorAbsent {
                source_count: 1,
                target_count: 0
            })
        );
    }

    #[test]
    fn single_target_candidate_is_excluded_not_an_error() {
        let source = descriptors(&[[0.0, 0.0]]);
        let target = descriptors(&[[0.0, 0.0]]);
        let matches = RatioMatcher::default().matches(&source, &target).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn invalid_ratio_is_rejected_up_front() {
        let source = descriptors(&[[0.0, 0.0]]);
        for ratio in [0.0, -0.5, 1.5] {
            let result = RatioMatcher::new(ratio).matches(&source, &source);
            assert!(matches!(result, Err(Error::InvalidParameter { .. })));
        }
    }
}
