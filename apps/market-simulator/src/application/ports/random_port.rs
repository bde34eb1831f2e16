//! Random Source Port (Driven Port)
//!
//! Signed uniform draws in `[-1, 1)` for price and volume perturbation.
//! Tests inject [`FixedRandom`] or [`SequenceRandom`] to make ticks
//! reproducible.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of signed uniform draws.
pub trait RandomSource: Send {
    /// Next value in `[-1, 1)`.
    fn next_signed(&mut self) -> f64;
}

/// Draws from the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_signed(&mut self) -> f64 {
        rand::rng().random_range(-1.0..1.0)
    }
}

/// Reproducible generator seeded from a fixed value.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    /// Create a generator from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_signed(&mut self) -> f64 {
        self.rng.random_range(-1.0..1.0)
    }
}

/// Always returns the same value.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_signed(&mut self) -> f64 {
        self.0
    }
}

/// Replays a fixed sequence, repeating the last value once exhausted.
#[derive(Debug, Clone, Default)]
pub struct SequenceRandom {
    values: VecDeque<f64>,
    last: f64,
}

impl SequenceRandom {
    /// Create a source replaying `values` in order.
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
            last: 0.0,
        }
    }
}

impl RandomSource for SequenceRandom {
    fn next_signed(&mut self) -> f64 {
        if let Some(value) = self.values.pop_front() {
            self.last = value;
        }
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_random_stays_in_range() {
        let mut source = ThreadRandom;
        for _ in 0..1_000 {
            let value = source.next_signed();
            assert!((-1.0..1.0).contains(&value));
        }
    }

    #[test]
    fn seeded_random_is_reproducible() {
        let mut a = SeededRandom::new(42);
        let mut b = SeededRandom::new(42);
        for _ in 0..32 {
            assert!((a.next_signed() - b.next_signed()).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn sequence_repeats_last_value() {
        let mut source = SequenceRandom::new([0.5, -0.25]);
        assert!((source.next_signed() - 0.5).abs() < f64::EPSILON);
        assert!((source.next_signed() + 0.25).abs() < f64::EPSILON);
        assert!((source.next_signed() + 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_sequence_yields_zero() {
        assert!(SequenceRandom::default().next_signed().abs() < f64::EPSILON);
    }
}
