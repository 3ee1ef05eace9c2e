//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Threshold document error: {0}")]
    Thresholds(#[from] tripwire_config::ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] tripwire_registry::RegistryError),

    #[error("Source error: {0}")]
    Source(#[from] tripwire_registry::SourceError),

    #[error("Throttle error: {0}")]
    Throttle(#[from] tripwire_throttle::ThrottleError),

    #[error("Notification error: {0}")]
    Notify(#[from] tripwire_notify::NotifyError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] tripwire_telemetry::TelemetryError),

    #[error("All {failed} input sources failed")]
    InputsUnavailable { failed: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
