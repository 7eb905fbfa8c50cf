use space::Metric;

/// A fixed-length local feature descriptor compared under Euclidean distance.
///
/// `N` is the descriptor dimensionality, fixed for a whole detector output
/// (128 for SIFT-style float descriptors). Descriptors from both images of a
/// match operation must share `N` and the distance metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor<const N: usize>(pub [f32; N]);

impl<const N: usize> Descriptor<N> {
    /// Euclidean distance to another descriptor.
    pub fn distance(&self, other: &Self) -> f32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
    }
}

impl<const N: usize> From<[f32; N]> for Descriptor<N> {
    fn from(values: [f32; N]) -> Self {
        Self(values)
    }
}

/// Euclidean (L2) metric over [`Descriptor`] for nearest-neighbor search.
///
/// `space` requires distances to be unsigned integers, so the f32 distance is
/// mapped through its IEEE-754 bit representation, which is order-preserving
/// for non-negative floats. Recover the real distance with `f32::from_bits`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl<const N: usize> Metric<Descriptor<N>> for Euclidean {
    type Unit = u32;

    fn distance(&self, a: &Descriptor<N>, b: &Descriptor<N>) -> u32 {
        a.distance(b).to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Descriptor([0.0, 3.0]);
        let b = Descriptor([4.0, 0.0]);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn bit_mapping_preserves_order() {
        let origin = Descriptor([0.0, 0.0]);
        let near = Descriptor([1.0, 1.0]);
        let far = Descriptor([10.0, 10.0]);
        let m = Euclidean;
        assert!(m.distance(&origin, &near) < m.distance(&origin, &far));
        assert_eq!(
            f32::from_bits(m.distance(&origin, &near)),
            origin.distance(&near)
        );
    }
}
