//! Entropy as an injected capability (spec.md §5, §9 "Randomness and
//! reproducibility"): both the SE key and the flattener's dense-id
//! shuffle go through this trait so tests can substitute a fixed seed
//! and get byte-identical output.

use rand::rngs::{StdRng, ThreadRng};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub trait EntropySource {
    /// A single key byte in `[1, 255]` (0 would make the XOR a no-op).
    fn key_byte(&mut self) -> u8;

    /// Shuffles the dense state-id assignment so flattened block ids
    /// don't mirror the function's original block order.
    fn shuffle_ids(&mut self, ids: &mut [u32]);
}

/// Non-deterministic source, used outside of tests.
pub struct OsEntropy(ThreadRng);

impl OsEntropy {
    pub fn new() -> Self {
        OsEntropy(rand::thread_rng())
    }
}

impl Default for OsEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for OsEntropy {
    fn key_byte(&mut self) -> u8 {
        self.0.gen_range(1..=255)
    }

    fn shuffle_ids(&mut self, ids: &mut [u32]) {
        ids.shuffle(&mut self.0);
    }
}

/// Fixed-seed source (spec.md §5, §8 "Determinism under fixed seed").
pub struct SeededEntropy(StdRng);

impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        SeededEntropy(StdRng::seed_from_u64(seed))
    }
}

impl EntropySource for SeededEntropy {
    fn key_byte(&mut self) -> u8 {
        self.0.gen_range(1..=255)
    }

    fn shuffle_ids(&mut self, ids: &mut [u32]) {
        ids.shuffle(&mut self.0);
    }
}
