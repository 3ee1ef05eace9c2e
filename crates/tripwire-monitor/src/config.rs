//! Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use tripwire_core::RetryPolicy;
use tripwire_notify::ChannelConfig;

use crate::error::{MonitorError, MonitorResult};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "TRIPWIRE_CONFIG";
/// Config file used when `TRIPWIRE_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
/// Prefix for per-key environment overrides, e.g. `TRIPWIRE__POLL_INTERVAL_SECS`.
pub const ENV_PREFIX: &str = "TRIPWIRE";

/// A JSON file input source.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub path: PathBuf,
}

/// Input source settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourcesConfig {
    /// Per-call timeout (seconds). Default: 30.
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts per call including the first. Default: 3.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff base delay (ms). Default: 500.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default)]
    pub positions: Vec<SourceFile>,
    #[serde(default)]
    pub prices: Vec<SourceFile>,
}

fn default_source_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_source_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            positions: Vec::new(),
            prices: Vec::new(),
        }
    }
}

impl SourcesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay_ms: self.base_delay_ms,
            ..RetryPolicy::default()
        }
    }
}

/// Telemetry output.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Prometheus text file rewritten after every cycle.
    #[serde(default)]
    pub metrics_textfile: Option<PathBuf>,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Seconds between evaluation cycles. Default: 60.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Threshold document (JSON).
    #[serde(default = "default_threshold_path")]
    pub threshold_path: PathBuf,
    /// Alert records (JSON array).
    #[serde(default = "default_alert_store_path")]
    pub alert_store_path: PathBuf,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub notification: ChannelConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_threshold_path() -> PathBuf {
    PathBuf::from("data/alert_thresholds.json")
}

fn default_alert_store_path() -> PathBuf {
    PathBuf::from("data/alerts.json")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            threshold_path: default_threshold_path(),
            alert_store_path: default_alert_store_path(),
            sources: SourcesConfig::default(),
            notification: ChannelConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `TRIPWIRE_CONFIG` (default `config/default.toml`) layered
    /// with `TRIPWIRE__*` environment overrides.
    pub fn load() -> MonitorResult<Self> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&config_path)
    }

    /// Load `path` (optional) layered with environment overrides.
    pub fn load_from(path: &str) -> MonitorResult<Self> {
        if !Path::new(path).exists() {
            warn!(path = %path, "Config file not found, using defaults");
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(Path::new(path)).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| MonitorError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| MonitorError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file, without environment overrides.
    pub fn from_file(path: &str) -> MonitorResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| MonitorError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MonitorResult<()> {
        if self.poll_interval_secs == 0 {
            return Err(MonitorError::Config(
                "poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.sources.max_attempts == 0 {
            return Err(MonitorError::Config(
                "sources.max_attempts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
