//! Error types for tripwire-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid alert: {0}")]
    InvalidAlert(String),

    #[error("Unrecognized alert type: {0}")]
    UnrecognizedAlertType(String),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
