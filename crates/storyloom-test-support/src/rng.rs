//! Deterministic `DeterministicRng` implementations for tests.

use storyloom_core::rng::DeterministicRng;

/// A no-op RNG that always returns `min` for `next_u32_range`. With `shuffle`
/// this yields a fixed, non-identity permutation, which is enough for tests
/// that only need reproducibility.
#[derive(Debug)]
pub struct MockRng;

impl DeterministicRng for MockRng {
    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }
}

/// An RNG that returns values from a predetermined sequence, clamped into the
/// requested range. Once the sequence is exhausted it keeps returning `max`,
/// which makes `shuffle` leave the remaining prefix in place.
#[derive(Debug)]
pub struct SequenceRng {
    values: Vec<u32>,
    index: usize,
}

impl SequenceRng {
    /// Create a new `SequenceRng` with the given values.
    #[must_use]
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, index: 0 }
    }
}

impl DeterministicRng for SequenceRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        let Some(&val) = self.values.get(self.index) else {
            return max;
        };
        self.index += 1;
        val.clamp(min, max.max(min))
    }
}
