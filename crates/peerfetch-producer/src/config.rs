//! Producer-side configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use peerfetch_core::namespace::{DEFAULT_PREFIX, DEFAULT_RELAY_TARGETS};
use peerfetch_core::packet::FAKE_SIGNATURE_TYPE;
use peerfetch_core::types::duration_millis;
use peerfetch_core::{Name, Signature};

use crate::error::Result;

/// Settings shared by every replying application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub prefix: String,
    /// Size censored payloads are padded to.
    pub payload_size: usize,
    /// Freshness of produced replies; zero means unlimited.
    #[serde(with = "duration_millis")]
    pub freshness: Duration,
    /// Value placed in the placeholder signature.
    pub fake_signature_value: u32,
    /// Optional key locator placed in the placeholder signature.
    pub key_locator_name: Option<String>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            payload_size: 1024,
            freshness: Duration::ZERO,
            fake_signature_value: 0,
            key_locator_name: None,
        }
    }
}

impl ProducerConfig {
    /// Placeholder signature for produced replies.
    pub fn signature(&self) -> Result<Signature> {
        let key_locator = self
            .key_locator_name
            .as_deref()
            .map(Name::parse)
            .transpose()?;
        Ok(Signature {
            signature_type: FAKE_SIGNATURE_TYPE,
            key_locator,
            value: self.fake_signature_value,
        })
    }
}

/// Settings for the sync poller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPollerConfig {
    pub prefix: String,
    #[serde(with = "duration_millis")]
    pub poll_period: Duration,
    #[serde(with = "duration_millis")]
    pub request_lifetime: Duration,
    pub relay_targets: Vec<String>,
}

impl Default for SyncPollerConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            poll_period: Duration::from_millis(250),
            request_lifetime: Duration::from_secs(2),
            relay_targets: DEFAULT_RELAY_TARGETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
