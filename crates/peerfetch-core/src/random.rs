//! Pluggable randomness.
//!
//! Every random decision (nonces, send jitter, relay choice) goes through
//! [`RandomSource`], so a seeded generator makes a whole run reproducible.

use rand::{Rng, RngCore};

/// Source of the random draws the protocol needs.
pub trait RandomSource {
    /// A request nonce.
    fn nonce(&mut self) -> u32;

    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform index in `0..len`, `None` when `len == 0`.
    fn pick_index(&mut self, len: usize) -> Option<usize>;

    /// Uniform draw in `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.unit()
    }

    /// Exponential draw with the given mean (inverse CDF).
    fn exponential(&mut self, mean: f64) -> f64 {
        -mean * (1.0 - self.unit()).ln()
    }
}

impl<R: RngCore + ?Sized> RandomSource for R {
    fn nonce(&mut self) -> u32 {
        self.next_u32()
    }

    fn unit(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn pick_index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.gen_range(0..len))
    }
}
