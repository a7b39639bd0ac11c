//! Randomness used by the weighted and adaptive strategies.
//!
//! Strategies take an `Arc<dyn RandomSource>` so tests can swap the thread RNG
//! for a seeded one and get reproducible selections.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Debug;

/// Source of uniform random numbers
pub trait RandomSource: Send + Sync + Debug {
    /// Uniform value in `[0, 1)`
    fn next_f64(&self) -> f64;

    /// Uniform index in `[0, len)`; `len` must be non-zero
    fn next_index(&self, len: usize) -> usize {
        let index = (self.next_f64() * len as f64) as usize;
        index.min(len.saturating_sub(1))
    }
}

/// Thread-local RNG from `rand`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }

    fn next_index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Deterministic RNG seeded at construction
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&self) -> f64 {
        self.rng.lock().gen::<f64>()
    }

    fn next_index(&self, len: usize) -> usize {
        self.rng.lock().gen_range(0..len)
    }
}

/// Fisher-Yates shuffle in place
pub fn shuffle<T>(items: &mut [T], random: &dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = random.next_index(i + 1);
        items.swap(i, j);
    }
}

/// Pick an index with probability proportional to its weight
///
/// Walks the cumulative distribution of `weights`. Returns `None` when there
/// are no weights or they sum to zero.
pub fn pick_weighted(weights: &[f64], random: &dyn RandomSource) -> Option<usize> {
    let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
    if weights.is_empty() || total <= 0.0 || !total.is_finite() {
        return None;
    }

    let target = random.next_f64() * total;
    let mut cumulative = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        cumulative += weight.max(0.0);
        if target < cumulative {
            return Some(index);
        }
    }

    // Floating point rounding can leave target == total
    weights.iter().rposition(|w| *w > 0.0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays a fixed sequence of draws
    #[derive(Debug)]
    pub(crate) struct FixedRandom(Mutex<VecDeque<f64>>);

    impl FixedRandom {
        pub(crate) fn new(values: &[f64]) -> Self {
            Self(Mutex::new(values.iter().copied().collect()))
        }
    }

    impl RandomSource for FixedRandom {
        fn next_f64(&self) -> f64 {
            self.0.lock().pop_front().unwrap_or(0.0)
        }
    }

    #[test]
    fn test_pick_weighted_follows_cumulative_distribution() {
        let weights = [10.0, 30.0, 60.0];

        assert_eq!(pick_weighted(&weights, &FixedRandom::new(&[0.05])), Some(0));
        assert_eq!(pick_weighted(&weights, &FixedRandom::new(&[0.2])), Some(1));
        assert_eq!(pick_weighted(&weights, &FixedRandom::new(&[0.99])), Some(2));
    }

    #[test]
    fn test_pick_weighted_degenerate_inputs() {
        let random = SeededRandom::new(7);
        assert_eq!(pick_weighted(&[], &random), None);
        assert_eq!(pick_weighted(&[0.0, 0.0], &random), None);
        assert_eq!(pick_weighted(&[0.0, 5.0], &random), Some(1));
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let random = SeededRandom::new(42);
        let mut items: Vec<u32> = (0..20).collect();
        shuffle(&mut items, &random);

        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let a = SeededRandom::new(99);
        let b = SeededRandom::new(99);
        for _ in 0..10 {
            assert_eq!(a.next_index(17), b.next_index(17));
        }
        assert!((0.0..1.0).contains(&ThreadRandom.next_f64()));
    }
}
