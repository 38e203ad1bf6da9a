//! Inter-send delays.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use peerfetch_core::RandomSource;

/// Exponential draws above this many mean periods are redrawn.
const EXPONENTIAL_BOUND_PERIODS: f64 = 50.0;

/// How the gap between sends is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Randomization {
    /// Fixed period `1 / frequency`.
    #[default]
    None,
    /// Uniform in `[0, 2 / frequency)`.
    Uniform,
    /// Exponential with mean `1 / frequency`, bounded at `50 / frequency`.
    Exponential,
}

/// Send cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cadence {
    frequency: f64,
    mode: Randomization,
}

impl Cadence {
    /// `frequency` is in sends per second and must be positive.
    pub fn new(frequency: f64, mode: Randomization) -> Self {
        Self { frequency, mode }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frequency)
    }

    pub fn mode(&self) -> Randomization {
        self.mode
    }

    /// Delay before the next send.
    pub fn next_delay<R: RandomSource + ?Sized>(&self, rng: &mut R) -> Duration {
        let period = 1.0 / self.frequency;
        let secs = match self.mode {
            Randomization::None => period,
            Randomization::Uniform => rng.uniform(0.0, 2.0 * period),
            Randomization::Exponential => {
                let bound = EXPONENTIAL_BOUND_PERIODS * period;
                loop {
                    let draw = rng.exponential(period);
                    if draw <= bound {
                        break draw;
                    }
                }
            }
        };
        Duration::from_secs_f64(secs)
    }
}
