//! Registry error types.

use thiserror::Error;
use tripwire_core::{CoreError, Recoverable};

/// Alert persistence errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid alert: {0}")]
    InvalidAlert(#[from] CoreError),

    #[error("Duplicate alert id: {0}")]
    Duplicate(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Position and price source errors.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source {source_name} timed out after {timeout_ms}ms")]
    Timeout { source_name: String, timeout_ms: u64 },

    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed source data: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Recoverable for SourceError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Unavailable(_) => true,
            Self::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ),
            Self::Malformed(_) => false,
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
