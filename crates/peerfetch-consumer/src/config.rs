//! Consumer configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use peerfetch_core::namespace::{DEFAULT_PREFIX, DEFAULT_RELAY_TARGETS};
use peerfetch_core::types::duration_millis;

use crate::cadence::Randomization;
use crate::error::{ConsumerError, Result};
use crate::scheduler::UNBOUNDED;

/// Configuration for a [`PeerConsumer`](crate::PeerConsumer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Application prefix.
    pub prefix: String,
    /// Sequence used for the metadata request.
    pub start_sequence: u32,
    /// Budget of fresh requests; `u32::MAX` is unbounded.
    pub max_sequence: u32,
    #[serde(with = "duration_millis")]
    pub request_lifetime: Duration,
    #[serde(with = "duration_millis")]
    pub retransmit_check_period: Duration,
    /// Sends per second.
    pub send_frequency: f64,
    pub randomization: Randomization,
    pub peer_key: u32,
    /// Single name component identifying this peer.
    pub peer_identity: String,
    /// Rendezvous identities pushes are forwarded through.
    pub relay_targets: Vec<String>,
    /// Non-original replies tolerated before a local sync is requested.
    pub retry_threshold: u32,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            start_sequence: 0,
            max_sequence: UNBOUNDED,
            request_lifetime: Duration::from_secs(2),
            retransmit_check_period: Duration::from_millis(50),
            send_frequency: 1.0,
            randomization: Randomization::None,
            peer_key: 10001,
            peer_identity: "peer".to_string(),
            relay_targets: DEFAULT_RELAY_TARGETS.iter().map(|s| s.to_string()).collect(),
            retry_threshold: 3,
        }
    }
}

impl ConsumerConfig {
    /// Defaults with the given peer credentials.
    pub fn for_peer(identity: impl Into<String>, key: u32) -> Self {
        Self {
            peer_identity: identity.into(),
            peer_key: key,
            ..Self::default()
        }
    }

    /// Reject values the consumer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.send_frequency.is_finite() && self.send_frequency > 0.0) {
            return Err(ConsumerError::InvalidConfig(format!(
                "send_frequency must be positive, got {}",
                self.send_frequency
            )));
        }
        if self.peer_identity.is_empty() || self.peer_identity.contains('/') {
            return Err(ConsumerError::InvalidConfig(format!(
                "peer_identity must be a single name component, got {:?}",
                self.peer_identity
            )));
        }
        if self.retransmit_check_period.is_zero() {
            return Err(ConsumerError::InvalidConfig(
                "retransmit_check_period must be non-zero".to_string(),
            ));
        }
        if self.retry_threshold == 0 {
            return Err(ConsumerError::InvalidConfig(
                "retry_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
