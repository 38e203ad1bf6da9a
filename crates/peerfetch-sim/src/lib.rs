//! # Peerfetch Simulation
//!
//! A deterministic discrete-event [`Substrate`](peerfetch_core::Substrate)
//! for the peerfetch applications, and the proxy scenario built on it.
//!
//! ```no_run
//! use peerfetch_sim::proxy_scenario;
//!
//! let mut scenario = proxy_scenario(2, 1)?;
//! let report = scenario.run()?;
//! assert!(report.all_settled());
//! # Ok::<(), peerfetch_sim::SimError>(())
//! ```

pub mod config;
pub mod error;
pub mod scenario;
pub mod simulation;

pub use config::SimConfig;
pub use error::{Result, SimError};
pub use scenario::{
    proxy_scenario, PeerHandles, PeerReport, ProxyScenario, ProxyScenarioConfig, ScenarioReport,
    FIRST_INVALID_KEY, FIRST_VALID_KEY,
};
pub use simulation::{AppId, NetworkStats, NodeId, Simulation};
