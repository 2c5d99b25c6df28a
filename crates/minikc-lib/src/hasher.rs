//! Deterministic seeded hashing for minimizers.
//!
//! Built on ahash with explicit seeds so that every rank computes the same
//! hash for the same minimizer value. Used by the hash-mod binning mode and
//! for seeding the count table's build hasher.

use ahash::RandomState;
use std::hash::{BuildHasher, Hasher};

/// A deterministic hasher with a seeded state
#[derive(Clone)]
pub struct DeterministicHasher {
    seed: u64,
    state: RandomState,
}

impl DeterministicHasher {
    /// Create a new deterministic hasher with the given seed
    pub fn new(seed: u64) -> Self {
        let state = RandomState::with_seeds(seed, !seed, seed, !seed);
        Self { seed, state }
    }

    /// Hash a u64 value
    #[inline]
    pub fn hash_u64(&self, value: u64) -> u64 {
        let mut hasher = self.state.build_hasher();
        hasher.write_u64(value);
        hasher.finish()
    }

    /// The seed this hasher was built with
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// A seeded `RandomState` suitable as a map build hasher
    pub fn build_state(seed: u64) -> RandomState {
        RandomState::with_seeds(seed, !seed, seed.rotate_left(32), !seed.rotate_left(32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_hashing() {
        let h1 = DeterministicHasher::new(42);
        let h2 = DeterministicHasher::new(42);
        let h3 = DeterministicHasher::new(43);

        let value = 0x123456789abcdef0u64;
        assert_eq!(h1.hash_u64(value), h2.hash_u64(value));
        assert_ne!(h1.hash_u64(value), h3.hash_u64(value));
    }

    #[test]
    fn test_distinct_inputs() {
        let h = DeterministicHasher::new(1);
        assert_ne!(h.hash_u64(100), h.hash_u64(101));
    }
}
