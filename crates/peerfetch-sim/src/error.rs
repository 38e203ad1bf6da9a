//! Error types for the simulation substrate.

use thiserror::Error;

use crate::simulation::{AppId, NodeId};

/// Errors raised while building or inspecting a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Application installed on a node that was never added.
    #[error("unknown node: {0:?}")]
    UnknownNode(NodeId),

    /// Inspection of an application that is not installed, or is not of
    /// the requested type.
    #[error("no application of the expected type at {0:?}")]
    UnknownApp(AppId),

    /// Scenario parameters rejected at build time.
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("core error: {0}")]
    Core(#[from] peerfetch_core::CoreError),

    #[error("consumer error: {0}")]
    Consumer(#[from] peerfetch_consumer::ConsumerError),

    #[error("producer error: {0}")]
    Producer(#[from] peerfetch_producer::ProducerError),
}

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
