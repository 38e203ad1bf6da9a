//! Error types for the unified API.

use peerfetch_consumer::ConsumerError;
use peerfetch_core::CoreError;
use peerfetch_producer::ProducerError;
use peerfetch_sim::SimError;
use thiserror::Error;

/// Errors that can occur while loading or running a scenario.
#[derive(Debug, Error)]
pub enum PeerfetchError {
    /// Name or content error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Consumer configuration error.
    #[error("consumer error: {0}")]
    Consumer(#[from] ConsumerError),

    /// Producer configuration error.
    #[error("producer error: {0}")]
    Producer(#[from] ProducerError),

    /// Simulation build or inspection error.
    #[error("simulation error: {0}")]
    Sim(#[from] SimError),

    /// Scenario file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Scenario file is not valid JSON for a scenario.
    #[error("invalid scenario file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for unified API operations.
pub type Result<T> = std::result::Result<T, PeerfetchError>;
