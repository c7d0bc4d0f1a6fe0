//! Sampling without replacement
//!
//! Each evaluation repetition draws a fresh [`SampleSet`] of population
//! indices. Determinism comes only from the caller seeding the rng.

use rand::Rng;
use tracing::warn;

/// Ordered subset of population indices, all distinct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSet {
    indices: Vec<usize>,
    population_size: usize,
}

impl SampleSet {
    /// Sample covering the whole population in order
    #[must_use]
    pub fn full(population_size: usize) -> Self {
        Self {
            indices: (0..population_size).collect(),
            population_size,
        }
    }

    /// Population indices in draw order
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of sampled items
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the sample is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Size of the population the sample was drawn from
    #[must_use]
    pub fn population_size(&self) -> usize {
        self.population_size
    }

    /// Population index at a sample position
    #[must_use]
    pub fn get(&self, position: usize) -> Option<usize> {
        self.indices.get(position).copied()
    }
}

/// Draw `sample_size` distinct indices from `0..population_size`.
///
/// A `sample_size` larger than the population is clamped with a warning.
pub fn sample<R: Rng + ?Sized>(
    population_size: usize,
    sample_size: usize,
    rng: &mut R,
) -> SampleSet {
    let amount = if sample_size > population_size {
        warn!(
            sample_size,
            population_size, "sample size exceeds population, clamping"
        );
        population_size
    } else {
        sample_size
    };

    let indices = rand::seq::index::sample(rng, population_size, amount).into_vec();

    SampleSet {
        indices,
        population_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_sample_distinct_and_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let set = sample(50, 20, &mut rng);
        assert_eq!(set.len(), 20);
        let unique: HashSet<_> = set.indices().iter().collect();
        assert_eq!(unique.len(), 20);
        assert!(set.indices().iter().all(|&i| i < 50));
    }

    #[test]
    fn test_sample_clamps() {
        let mut rng = StdRng::seed_from_u64(7);
        let set = sample(5, 100, &mut rng);
        assert_eq!(set.len(), 5);
        assert_eq!(set.population_size(), 5);
    }

    #[test]
    fn test_sample_empty_population() {
        let mut rng = StdRng::seed_from_u64(7);
        let set = sample(0, 10, &mut rng);
        assert!(set.is_empty());
    }

    #[test]
    fn test_sample_seeded_is_deterministic() {
        let a = sample(1000, 10, &mut StdRng::seed_from_u64(42));
        let b = sample(1000, 10, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_consecutive_draws_differ() {
        let mut rng = StdRng::seed_from_u64(42);
        let first = sample(1000, 10, &mut rng);
        let second = sample(1000, 10, &mut rng);
        assert_ne!(first, second);
    }

    #[test]
    fn test_full() {
        let set = SampleSet::full(4);
        assert_eq!(set.indices(), &[0, 1, 2, 3]);
        assert_eq!(set.get(2), Some(2));
        assert_eq!(set.get(4), None);
    }
}
