//! Simulation configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use peerfetch_core::types::duration_millis;
use peerfetch_core::SimTime;

/// Configuration for a [`Simulation`](crate::Simulation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for every random draw in the run.
    pub seed: u64,
    /// Link delay of applications installed without an explicit one.
    #[serde(with = "duration_millis")]
    pub link_delay: Duration,
    /// Virtual time at which scenario runs stop.
    #[serde(with = "duration_millis")]
    pub stop_time: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            link_delay: Duration::from_millis(10),
            stop_time: Duration::from_secs(60),
        }
    }
}

impl SimConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn stop_at(&self) -> SimTime {
        SimTime::from_duration(self.stop_time)
    }
}
