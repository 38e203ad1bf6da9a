//! # Peerfetch Producer
//!
//! Replying applications for the pull protocol.
//!
//! - [`ContentProducer`] validates peers, serves original items and
//!   answers sync polls from its [`DuplicateSyncTrigger`]
//! - [`SyncPoller`] polls for flagged items and pushes them through a relay
//! - [`RelayNode`] acknowledges pushes and re-emits peer deliveries
//! - [`PeerProducer`] buffers one pushed payload for its local consumer
//! - [`CensorProducer`] answers item requests with censored payloads

pub mod censor;
pub mod config;
pub mod content_producer;
pub mod error;
pub mod peer_producer;
pub mod relay_node;
pub mod sync_poller;
pub mod tracker;
pub mod validator;

pub use censor::{CensorProducer, CensorStats};
pub use config::{ProducerConfig, SyncPollerConfig};
pub use content_producer::{ContentProducer, ContentProducerStats};
pub use error::{ProducerError, Result};
pub use peer_producer::{PeerProducer, PeerProducerStats};
pub use relay_node::{RelayNode, RelayStats};
pub use sync_poller::{SyncPoller, SyncPollerStats};
pub use tracker::{DuplicateSyncTrigger, ItemTrackingRecord, Observation, DUPLICATE_THRESHOLD};
pub use validator::{PeerValidator, Verdict};
