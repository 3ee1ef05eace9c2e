//! Prometheus metrics and structured logging for tripwire.
//!
//! - Prometheus counters and gauges for evaluation, throttling and dispatch
//! - Structured JSON logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, init_logging_with, LogFormat};
pub use metrics::Metrics;
