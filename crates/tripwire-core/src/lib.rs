//! Core domain types for the tripwire alert engine.
//!
//! This crate provides the types shared by every other tripwire crate:
//! - `Alert`: persisted alert record with its type, class, level and bookkeeping
//! - `Position`, `PriceQuote`: read-only input snapshots
//! - `Clock`: time source, with a manual clock for driving tests
//! - `RetryPolicy`: bounded exponential backoff for recoverable I/O
//! - `write_atomic`: temp-file-and-rename persistence

pub mod alert;
pub mod atomic;
pub mod clock;
pub mod error;
pub mod position;
pub mod retry;

pub use alert::{
    Alert, AlertClass, AlertLevel, AlertStatus, AlertType, Condition, NotificationType,
};
pub use atomic::write_atomic;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, Result};
pub use position::{Position, PositionType, PriceQuote};
pub use retry::{retry_with_backoff, Recoverable, RetryPolicy};
