//! Error types for the peerfetch core.

use thiserror::Error;

/// Errors raised while building or parsing core primitives.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("name component {index} is not a sequence number")]
    NotASequence { index: usize },

    #[error("malformed content: {0}")]
    MalformedContent(String),

    #[error("malformed parameters: {0}")]
    MalformedParameters(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
