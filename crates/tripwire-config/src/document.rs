//! Typed view of the threshold document.
//!
//! Band boundaries are kept as raw JSON values and resolved on access so a
//! single malformed number falls back to the metric default instead of
//! rejecting the whole document.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use tripwire_core::{AlertLevel, AlertType, Condition};

use crate::error::ConfigResult;

// ============================================================================
// BandMetric
// ============================================================================

/// Position metrics that are judged against low/medium/high bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandMetric {
    TravelPercent,
    Profit,
    HeatIndex,
}

impl BandMetric {
    pub const ALL: [BandMetric; 3] = [Self::TravelPercent, Self::Profit, Self::HeatIndex];

    /// Metric judged by alerts of this type, if the type is banded.
    pub fn for_alert_type(alert_type: &AlertType) -> Option<Self> {
        match alert_type {
            AlertType::TravelPercentLiquid => Some(Self::TravelPercent),
            AlertType::Profit => Some(Self::Profit),
            AlertType::HeatIndex => Some(Self::HeatIndex),
            AlertType::PriceThreshold | AlertType::Unrecognized(_) => None,
        }
    }

    /// Alert type created for this metric.
    pub fn alert_type(&self) -> AlertType {
        match self {
            Self::TravelPercent => AlertType::TravelPercentLiquid,
            Self::Profit => AlertType::Profit,
            Self::HeatIndex => AlertType::HeatIndex,
        }
    }

    /// Key of this metric's band under `alert_ranges`.
    pub fn key(&self) -> &'static str {
        match self {
            Self::TravelPercent => "travel_percent_liquid_ranges",
            Self::Profit => "profit_ranges",
            Self::HeatIndex => "heat_index_ranges",
        }
    }

    /// Boundaries used when a configured one is absent or unparsable.
    ///
    /// Travel percent is negative and worsens downwards; -100 is liquidation.
    pub fn defaults(&self) -> Thresholds {
        match self {
            Self::TravelPercent => Thresholds::new(-4.0, -7.0, -10.0),
            Self::Profit => Thresholds::new(46.23, 101.3, 202.0),
            Self::HeatIndex => Thresholds::new(12.0, 16.0, 20.0),
        }
    }
}

impl fmt::Display for BandMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TravelPercent => write!(f, "travel_percent"),
            Self::Profit => write!(f, "profit"),
            Self::HeatIndex => write!(f, "heat_index"),
        }
    }
}

/// Resolved low/medium/high boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Thresholds {
    #[must_use]
    pub fn new(low: f64, medium: f64, high: f64) -> Self {
        Self { low, medium, high }
    }
}

// ============================================================================
// Notification routing
// ============================================================================

/// Which delivery routes a band (or one of its levels) asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationRouting {
    #[serde(default)]
    pub call: bool,
    #[serde(default)]
    pub sms: bool,
    #[serde(default)]
    pub email: bool,
}

// ============================================================================
// ThresholdRange
// ============================================================================

/// One metric's band configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRange {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub low: Option<Value>,
    #[serde(default)]
    pub medium: Option<Value>,
    #[serde(default)]
    pub high: Option<Value>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub notifications: NotificationRouting,
    #[serde(default)]
    pub low_notifications: Option<NotificationRouting>,
    #[serde(default)]
    pub medium_notifications: Option<NotificationRouting>,
    #[serde(default)]
    pub high_notifications: Option<NotificationRouting>,
}

fn default_enabled() -> bool {
    true
}

impl Default for ThresholdRange {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            low: None,
            medium: None,
            high: None,
            condition: None,
            notifications: NotificationRouting::default(),
            low_notifications: None,
            medium_notifications: None,
            high_notifications: None,
        }
    }
}

impl ThresholdRange {
    /// Resolve the boundaries for `metric`, falling back per boundary.
    pub fn thresholds(&self, metric: BandMetric) -> Thresholds {
        let defaults = metric.defaults();
        Thresholds {
            low: resolve_boundary(metric, "low", self.low.as_ref(), defaults.low),
            medium: resolve_boundary(metric, "medium", self.medium.as_ref(), defaults.medium),
            high: resolve_boundary(metric, "high", self.high.as_ref(), defaults.high),
        }
    }

    /// Configured condition; `None` when absent or unparsable.
    pub fn condition(&self) -> Option<Condition> {
        self.condition.as_deref().and_then(Condition::parse)
    }

    /// Routing for a level, preferring the per-level override.
    pub fn routing_for(&self, level: AlertLevel) -> NotificationRouting {
        let per_level = match level {
            AlertLevel::Low => self.low_notifications,
            AlertLevel::Medium => self.medium_notifications,
            AlertLevel::High | AlertLevel::Liquidated => self.high_notifications,
            AlertLevel::Normal | AlertLevel::Triggered => None,
        };
        per_level.unwrap_or(self.notifications)
    }
}

/// Parse a boundary given as a JSON number or numeric string.
pub(crate) fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn resolve_boundary(metric: BandMetric, name: &str, raw: Option<&Value>, default: f64) -> f64 {
    match raw {
        None | Some(Value::Null) => default,
        Some(value) => parse_number(value).unwrap_or_else(|| {
            warn!(
                %metric,
                boundary = name,
                value = %value,
                default,
                "Unparsable threshold, using default"
            );
            default
        }),
    }
}

// ============================================================================
// Price alerts
// ============================================================================

/// Per-asset market alert settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlertConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub trigger_value: Option<Value>,
    #[serde(default)]
    pub notifications: NotificationRouting,
}

impl PriceAlertConfig {
    /// Trigger as a number; 0.0 when absent or unparsable.
    pub fn trigger(&self) -> f64 {
        self.trigger_value
            .as_ref()
            .and_then(parse_number)
            .unwrap_or(0.0)
    }
}

// ============================================================================
// AlertRanges / SystemConfig
// ============================================================================

/// The `alert_ranges` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertRanges {
    #[serde(default)]
    pub price_alerts: BTreeMap<String, PriceAlertConfig>,
    #[serde(default)]
    pub travel_percent_liquid_ranges: ThresholdRange,
    #[serde(default)]
    pub profit_ranges: ThresholdRange,
    #[serde(default)]
    pub heat_index_ranges: ThresholdRange,
}

impl AlertRanges {
    pub fn band(&self, metric: BandMetric) -> &ThresholdRange {
        match metric {
            BandMetric::TravelPercent => &self.travel_percent_liquid_ranges,
            BandMetric::Profit => &self.profit_ranges,
            BandMetric::HeatIndex => &self.heat_index_ranges,
        }
    }
}

/// The optional `system_config` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_enabled")]
    pub alert_monitor_enabled: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            alert_monitor_enabled: default_enabled(),
        }
    }
}

// ============================================================================
// ThresholdDocument
// ============================================================================

/// One loaded threshold document.
///
/// Timer fields are Unix timestamps in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdDocument {
    #[serde(default = "default_alert_cooldown_seconds")]
    pub alert_cooldown_seconds: u64,
    #[serde(default = "default_call_refractory_period")]
    pub call_refractory_period: u64,
    #[serde(default = "default_snooze_countdown")]
    pub snooze_countdown: u64,
    #[serde(default)]
    pub call_refractory_start: Option<f64>,
    #[serde(default)]
    pub snooze_start: Option<f64>,
    /// Length of the active snooze (seconds), when one was started.
    #[serde(default)]
    pub snooze_duration: Option<u64>,
    #[serde(default)]
    pub alert_ranges: AlertRanges,
    #[serde(default)]
    pub system_config: SystemConfig,
}

fn default_alert_cooldown_seconds() -> u64 {
    900
}

fn default_call_refractory_period() -> u64 {
    3600
}

fn default_snooze_countdown() -> u64 {
    300
}

impl Default for ThresholdDocument {
    fn default() -> Self {
        Self {
            alert_cooldown_seconds: default_alert_cooldown_seconds(),
            call_refractory_period: default_call_refractory_period(),
            snooze_countdown: default_snooze_countdown(),
            call_refractory_start: None,
            snooze_start: None,
            snooze_duration: None,
            alert_ranges: AlertRanges::default(),
            system_config: SystemConfig::default(),
        }
    }
}

impl ThresholdDocument {
    /// Build the typed view from a raw JSON document.
    pub fn from_value(value: &Value) -> ConfigResult<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Band for a banded metric.
    pub fn band(&self, metric: BandMetric) -> &ThresholdRange {
        self.alert_ranges.band(metric)
    }

    /// Resolved boundaries for a banded metric.
    pub fn thresholds(&self, metric: BandMetric) -> Thresholds {
        self.band(metric).thresholds(metric)
    }

    pub fn monitor_enabled(&self) -> bool {
        self.system_config.alert_monitor_enabled
    }
}
