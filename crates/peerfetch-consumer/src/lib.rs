//! # Peerfetch Consumer
//!
//! The consumer side of the pull protocol: a request engine that paces
//! sends, tracks every outstanding request, adapts its retransmission
//! timeout to observed round trips, and walks a server-assigned item range.
//!
//! ## Components
//!
//! - [`RttEstimator`] - Mean-deviation RTT estimate with exponential backoff
//! - [`OutstandingTable`] - Time-ordered and per-sequence send records
//! - [`RetransmissionSweeper`] - Periodic oldest-first timeout scan
//! - [`RequestScheduler`] - Retransmissions first, then fresh requests
//! - [`Cadence`] - Constant, uniform or exponential send spacing
//! - [`PeerSession`] - `AwaitingMetadata -> Fetching -> Done | Rejected`
//! - [`ProxyRelay`] - One-shot push through a random rendezvous point
//! - [`PeerConsumer`] - The application tying them together

pub mod app;
pub mod cadence;
pub mod config;
pub mod error;
pub mod outstanding;
pub mod relay;
pub mod rtt;
pub mod scheduler;
pub mod session;
pub mod sweeper;

pub use app::{ConsumerStats, PeerConsumer};
pub use cadence::{Cadence, Randomization};
pub use config::ConsumerConfig;
pub use error::{ConsumerError, Result};
pub use outstanding::{OutstandingTable, ReplyDelays};
pub use relay::{PendingPush, ProxyRelay};
pub use rtt::{RttConfig, RttEstimator};
pub use scheduler::{RequestScheduler, Selection};
pub use session::{PeerSession, Phase, SessionState, Transition};
pub use sweeper::RetransmissionSweeper;
