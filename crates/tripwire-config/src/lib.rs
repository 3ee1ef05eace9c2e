//! Threshold configuration for tripwire.
//!
//! The threshold document is a JSON file holding per-metric bands, price
//! alert settings, throttle windows and the persisted throttle timers.
//! - `ThresholdConfig`: loads, validates and deep-merges the document on disk
//! - `ThresholdDocument`: typed view of one loaded document
//! - `BandMetric`: the three banded position metrics and their defaults

pub mod document;
pub mod error;
pub mod merge;
pub mod store;

pub use document::{
    AlertRanges, BandMetric, NotificationRouting, PriceAlertConfig, SystemConfig,
    ThresholdDocument, ThresholdRange, Thresholds,
};
pub use error::{ConfigError, ConfigResult};
pub use merge::{deep_merge, validate_bands};
pub use store::ThresholdConfig;
