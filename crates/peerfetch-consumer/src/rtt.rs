//! Mean-deviation round-trip estimator with exponential backoff.
//!
//! ```text
//! first sample:  srtt = m, rttvar = m / 2
//! later samples: err = m - srtt
//!                srtt   += alpha * err
//!                rttvar += beta * (|err| - rttvar)
//! rto = min(max_rto, multiplier * max(min_rto, srtt + 4 * rttvar))
//! ```
//!
//! A timeout doubles the multiplier (capped); a valid sample resets it.

use std::time::Duration;

/// Estimator tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttConfig {
    /// Estimate before any sample.
    pub initial_estimate: Duration,
    /// Gain applied to the mean.
    pub alpha: f64,
    /// Gain applied to the deviation.
    pub beta: f64,
    pub min_rto: Duration,
    pub max_rto: Duration,
    pub max_multiplier: u32,
}

impl Default for RttConfig {
    fn default() -> Self {
        Self {
            initial_estimate: Duration::from_secs(1),
            alpha: 0.125,
            beta: 0.25,
            min_rto: Duration::from_millis(200),
            max_rto: Duration::from_secs(200),
            max_multiplier: 64,
        }
    }
}

/// Adaptive retransmission timeout.
#[derive(Debug, Clone)]
pub struct RttEstimator {
    config: RttConfig,
    srtt: f64,
    rttvar: f64,
    samples: u64,
    multiplier: u32,
}

impl RttEstimator {
    pub fn new(config: RttConfig) -> Self {
        Self {
            srtt: config.initial_estimate.as_secs_f64(),
            rttvar: 0.0,
            samples: 0,
            multiplier: 1,
            config,
        }
    }

    /// Feed one round-trip measurement and reset the backoff.
    ///
    /// Callers must not feed samples for retransmitted requests.
    pub fn sample(&mut self, rtt: Duration) {
        let m = rtt.as_secs_f64();
        if self.samples == 0 {
            self.srtt = m;
            self.rttvar = m / 2.0;
        } else {
            let err = m - self.srtt;
            self.srtt += self.config.alpha * err;
            self.rttvar += self.config.beta * (err.abs() - self.rttvar);
        }
        self.samples += 1;
        self.multiplier = 1;
    }

    /// Double the backoff multiplier, up to the cap.
    pub fn backoff(&mut self) {
        self.multiplier = self
            .multiplier
            .saturating_mul(2)
            .min(self.config.max_multiplier);
    }

    /// Current retransmission timeout.
    pub fn rto(&self) -> Duration {
        let base = (self.srtt + 4.0 * self.rttvar).max(self.config.min_rto.as_secs_f64());
        let rto = (base * self.multiplier as f64).min(self.config.max_rto.as_secs_f64());
        Duration::from_secs_f64(rto)
    }

    /// Smoothed estimate.
    pub fn srtt(&self) -> Duration {
        Duration::from_secs_f64(self.srtt)
    }

    pub fn rttvar(&self) -> Duration {
        Duration::from_secs_f64(self.rttvar)
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new(RttConfig::default())
    }
}
