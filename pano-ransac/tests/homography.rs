use pano_core::{nalgebra::Point2, Error, FeatureMatch, Homography};
use pano_ransac::HomographyEstimator;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

fn ground_truth() -> Homography {
    Homography::from_row_major([1.1, 0.05, 20.0, -0.03, 0.95, -8.0, 1e-4, -5e-5, 1.0])
}

/// Synthetic correspondences: `inliers` points mapped through the ground
/// truth with bounded noise, followed by `outliers` random pairings.
fn synthetic_matches(
    inliers: usize,
    outliers: usize,
    noise: f64,
    rng: &mut impl Rng,
) -> Vec<FeatureMatch> {
    let truth = ground_truth();
    let mut matches = Vec::new();
    for _ in 0..inliers {
        let a = Point2::new(rng.gen_range(0.0..640.0), rng.gen_range(0.0..480.0));
        let b = truth.transform(a);
        let b = Point2::new(
            b.x + rng.gen_range(-noise..=noise),
            b.y + rng.gen_range(-noise..=noise),
        );
        matches.push(FeatureMatch(a, b));
    }
    for _ in 0..outliers {
        matches.push(FeatureMatch(
            Point2::new(rng.gen_range(0.0..640.0), rng.gen_range(0.0..480.0)),
            Point2::new(rng.gen_range(0.0..640.0), rng.gen_range(0.0..480.0)),
        ));
    }
    matches
}

#[test]
fn recovers_known_homography_under_contamination() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
    let matches = synthetic_matches(30, 10, 0.0, &mut rng);
    let truth = ground_truth();

    let (estimated, mask) = HomographyEstimator::default()
        .estimate(&matches, Xoshiro256PlusPlus::seed_from_u64(0))
        .expect("consensus should succeed on mostly-inlier data");

    assert_eq!(mask.len(), matches.len());
    // Every genuine inlier should be identified on noise-free data.
    assert!(mask.iter().take(30).all(|&inlier| inlier));
    // The recovered transform reprojects like the ground truth to well
    // under a pixel when the inliers carry no noise.
    for m in matches.iter().take(30) {
        let through_truth = truth.transform(m.0);
        let through_estimate = estimated.transform(m.0);
        assert!(pano_core::nalgebra::distance(&through_truth, &through_estimate) < 1.0);
    }
}

#[test]
fn inliers_reproject_below_threshold() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let matches = synthetic_matches(25, 15, 0.5, &mut rng);
    let estimator = HomographyEstimator::default();

    let (estimated, mask) = estimator
        .estimate(&matches, Xoshiro256PlusPlus::seed_from_u64(7))
        .unwrap();

    for (m, &inlier) in matches.iter().zip(mask.iter()) {
        if inlier {
            assert!(estimated.reprojection_error(m) < estimator.reproj_threshold);
        }
    }
}

#[test]
fn inlier_count_is_monotone_in_threshold() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
    let matches = synthetic_matches(20, 20, 0.5, &mut rng);

    let mut previous = 0;
    for threshold in [1.0, 2.0, 5.0, 10.0] {
        let (_, mask) = HomographyEstimator::new(threshold)
            .estimate(&matches, Xoshiro256PlusPlus::seed_from_u64(3))
            .unwrap();
        let count = mask.iter().filter(|&&inlier| inlier).count();
        assert!(count >= previous);
        previous = count;
    }
}

#[test]
fn identical_seeds_reproduce_the_result() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
    let matches = synthetic_matches(15, 15, 0.3, &mut rng);
    let estimator = HomographyEstimator::default();

    let (first, first_mask) = estimator
        .estimate(&matches, Xoshiro256PlusPlus::seed_from_u64(42))
        .unwrap();
    let (second, second_mask) = estimator
        .estimate(&matches, Xoshiro256PlusPlus::seed_from_u64(42))
        .unwrap();

    assert_eq!(first.to_row_major(), second.to_row_major());
    assert_eq!(first_mask, second_mask);
}

#[test]
fn three_matches_are_insufficient_not_a_crash() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
    let matches = synthetic_matches(3, 0, 0.0, &mut rng);
    let result = HomographyEstimator::default()
        .estimate(&matches, Xoshiro256PlusPlus::seed_from_u64(1));
    assert_eq!(
        result.unwrap_err(),
        Error::InsufficientCorrespondences {
            found: 3,
            required: 4
        }
    );
}

#[test]
fn fully_collinear_data_is_degenerate_geometry() {
    // Every point lies on one line, so every minimal sample is rejected and
    // the budget runs out without a single candidate model.
    let matches: Vec<FeatureMatch> = (0..10)
        .map(|i| {
            let p = Point2::new(i as f64, 2.0 * i as f64);
            FeatureMatch(p, p)
        })
        .collect();
    let result = HomographyEstimator::default()
        .estimate(&matches, Xoshiro256PlusPlus::seed_from_u64(0));
    assert!(matches!(
        result,
        Err(Error::DegenerateGeometry {
            inliers: 0,
            required: 4,
            ..
        })
    ));
}

#[test]
fn non_positive_threshold_is_rejected_before_estimation() {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
    let matches = synthetic_matches(10, 0, 0.0, &mut rng);
    for threshold in [0.0, -1.0] {
        let result = HomographyEstimator::new(threshold)
            .estimate(&matches, Xoshiro256PlusPlus::seed_from_u64(5));
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }
}
