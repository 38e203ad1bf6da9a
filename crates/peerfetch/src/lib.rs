//! # Peerfetch
//!
//! A named request/reply protocol in which consumers prove a peer key to
//! obtain a work range, walk that range item by item, and recover items a
//! censoring producer withholds through duplicate-triggered pushes relayed
//! via redundant rendezvous points.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use peerfetch::ScenarioConfig;
//!
//! let config = ScenarioConfig::from_json(r#"{"scenario": {"valid_peers": 3}}"#)?;
//! let report = config.run()?;
//! println!("settled: {}", report.all_settled());
//! # Ok::<(), peerfetch::PeerfetchError>(())
//! ```
//!
//! ## Re-exports
//!
//! - `peerfetch::core` - names, packets, namespace and the substrate contract
//! - `peerfetch::consumer` - request engine and consumer application
//! - `peerfetch::producer` - validator, sync trigger and replying applications
//! - `peerfetch::sim` - discrete-event substrate and the proxy scenario

pub mod error;
pub mod scenario;

// Re-export component crates
pub use peerfetch_consumer as consumer;
pub use peerfetch_core as core;
pub use peerfetch_producer as producer;
pub use peerfetch_sim as sim;

pub use error::{PeerfetchError, Result};
pub use scenario::ScenarioConfig;

// Re-export commonly used types
pub use peerfetch_consumer::{ConsumerConfig, PeerConsumer, SessionState};
pub use peerfetch_core::{Application, Data, Interest, Nack, Name, SimTime, Substrate};
pub use peerfetch_producer::{
    CensorProducer, ContentProducer, PeerProducer, ProducerConfig, RelayNode, SyncPoller,
};
pub use peerfetch_sim::{proxy_scenario, ScenarioReport, SimConfig, Simulation};
