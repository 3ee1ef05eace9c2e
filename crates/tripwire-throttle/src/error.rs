//! Throttle error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThrottleError {
    #[error("Failed to persist throttle timers: {0}")]
    Persistence(String),
}

pub type ThrottleResult<T> = Result<T, ThrottleError>;
