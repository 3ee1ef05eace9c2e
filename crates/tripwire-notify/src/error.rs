//! Notification error types.

use thiserror::Error;
use tripwire_core::Recoverable;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid channel configuration: {0}")]
    Config(String),
}

impl Recoverable for NotifyError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::HttpClient(_) | Self::Timeout => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::HttpClient(e.to_string())
        }
    }
}

pub type NotifyResult<T> = Result<T, NotifyError>;
