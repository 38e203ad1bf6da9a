//! Error types for the consumer.

use thiserror::Error;

/// Errors raised while configuring a consumer.
///
/// Protocol outcomes (rejection, timeouts, exhaustion) are not errors; they
/// surface as session state.
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// Configuration rejected at construction.
    #[error("invalid consumer configuration: {0}")]
    InvalidConfig(String),

    /// A configured name failed to parse.
    #[error("core error: {0}")]
    Core(#[from] peerfetch_core::CoreError),
}

/// Result type for consumer operations.
pub type Result<T> = std::result::Result<T, ConsumerError>;
