//! Error types for producer applications.

use thiserror::Error;

/// Errors raised while configuring a producer-side application.
#[derive(Debug, Error)]
pub enum ProducerError {
    /// Configuration rejected at construction.
    #[error("invalid producer configuration: {0}")]
    InvalidConfig(String),

    /// A configured name failed to parse.
    #[error("core error: {0}")]
    Core(#[from] peerfetch_core::CoreError),
}

/// Result type for producer operations.
pub type Result<T> = std::result::Result<T, ProducerError>;
