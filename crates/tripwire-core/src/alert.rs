//! Alert record and its classification enums.
//!
//! An alert is either market-class (a price threshold on an asset) or
//! position-class (a metric of one tracked position). The class is derived
//! from the alert type and must agree with the presence of a position
//! reference.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

// ============================================================================
// AlertType
// ============================================================================

/// What an alert measures.
///
/// Stored records may carry legacy spellings ("travel_percent_alert",
/// "PROFIT ALERT"); they are canonicalized on deserialization. Names that
/// match no known type are kept verbatim in `Unrecognized` so the record
/// round-trips untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlertType {
    PriceThreshold,
    TravelPercentLiquid,
    Profit,
    HeatIndex,
    Unrecognized(String),
}

impl AlertType {
    /// Canonicalize a type name.
    ///
    /// Case, spaces, underscores and hyphens are ignored. Returns the input
    /// unchanged as `Err` when it names no known type.
    pub fn normalize(raw: &str) -> std::result::Result<Self, String> {
        let compact: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .collect::<String>()
            .to_uppercase();

        match compact.as_str() {
            "PRICETHRESHOLD" | "PRICEALERT" | "PRICE" => Ok(Self::PriceThreshold),
            "TRAVELPERCENT" | "TRAVELPERCENTALERT" | "TRAVELPERCENTLIQUID" => {
                Ok(Self::TravelPercentLiquid)
            }
            "PROFIT" | "PROFITALERT" => Ok(Self::Profit),
            "HEATINDEX" | "HEATINDEXALERT" => Ok(Self::HeatIndex),
            _ => Err(raw.to_string()),
        }
    }

    /// Canonical name as persisted.
    pub fn as_str(&self) -> &str {
        match self {
            Self::PriceThreshold => "PriceThreshold",
            Self::TravelPercentLiquid => "TravelPercentLiquid",
            Self::Profit => "Profit",
            Self::HeatIndex => "HeatIndex",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Returns true for the four types the engine knows how to evaluate.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<String> for AlertType {
    fn from(raw: String) -> Self {
        Self::normalize(&raw).unwrap_or(Self::Unrecognized(raw))
    }
}

impl From<AlertType> for String {
    fn from(alert_type: AlertType) -> Self {
        alert_type.as_str().to_string()
    }
}

impl std::str::FromStr for AlertType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::normalize(s).map_err(CoreError::UnrecognizedAlertType)
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// AlertClass
// ============================================================================

/// Market alerts watch an asset price; position alerts watch one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertClass {
    Market,
    Position,
}

impl AlertClass {
    /// Class implied by an alert type: market iff price threshold.
    pub fn for_type(alert_type: &AlertType) -> Self {
        match alert_type {
            AlertType::PriceThreshold => Self::Market,
            _ => Self::Position,
        }
    }
}

impl fmt::Display for AlertClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "Market"),
            Self::Position => write!(f, "Position"),
        }
    }
}

// ============================================================================
// Condition
// ============================================================================

/// Boundary direction for threshold checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Condition {
    #[default]
    #[serde(alias = "Above", alias = "above")]
    Above,
    #[serde(alias = "Below", alias = "below")]
    Below,
}

impl Condition {
    /// Parse a configured condition, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ABOVE" => Some(Self::Above),
            "BELOW" => Some(Self::Below),
            _ => None,
        }
    }

    /// Whether `value` has crossed `trigger` in this direction (inclusive).
    pub fn is_met(&self, value: f64, trigger: f64) -> bool {
        match self {
            Self::Above => value >= trigger,
            Self::Below => value <= trigger,
        }
    }
}

impl std::str::FromStr for Condition {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| CoreError::InvalidCondition(s.to_string()))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Above => write!(f, "ABOVE"),
            Self::Below => write!(f, "BELOW"),
        }
    }
}

// ============================================================================
// NotificationType / AlertStatus
// ============================================================================

/// Preferred delivery route for an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NotificationType {
    Call,
    #[default]
    Email,
    #[serde(rename = "SMS", alias = "Sms")]
    Sms,
    Action,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "Call"),
            Self::Email => write!(f, "Email"),
            Self::Sms => write!(f, "SMS"),
            Self::Action => write!(f, "Action"),
        }
    }
}

/// Inactive alerts are kept but skipped by the evaluation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AlertStatus {
    #[default]
    Active,
    Inactive,
}

// ============================================================================
// AlertLevel
// ============================================================================

/// Severity of an alert.
///
/// This is the single severity field of an alert. Banded position alerts
/// move between `Normal`, `Low`, `Medium` and `High`. Market alerts use
/// `Triggered` once their boundary is crossed. A travel alert whose position
/// has reached its liquidation price is `Liquidated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AlertLevel {
    #[default]
    Normal,
    Low,
    Medium,
    High,
    Triggered,
    Liquidated,
}

impl AlertLevel {
    /// Anything other than `Normal` produces a message.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Self::Normal)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Triggered => "Triggered",
            Self::Liquidated => "Liquidated",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Alert
// ============================================================================

/// Persisted alert record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub alert_type: AlertType,
    pub alert_class: AlertClass,
    pub asset_type: String,
    /// Boundary that must be crossed to justify the next notification.
    #[serde(default)]
    pub trigger_value: f64,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub notification_type: NotificationType,
    #[serde(default)]
    pub level: AlertLevel,
    #[serde(default)]
    pub status: AlertStatus,
    #[serde(default = "default_frequency")]
    pub frequency: u32,
    /// Number of times this alert's message was admitted for dispatch.
    #[serde(default)]
    pub counter: u32,
    #[serde(default)]
    pub evaluated_value: f64,
    #[serde(default)]
    pub position_reference_id: Option<String>,
    #[serde(default)]
    pub liquidation_distance: Option<f64>,
    #[serde(default)]
    pub liquidation_price: Option<f64>,
    #[serde(default)]
    pub travel_percent: Option<f64>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
}

fn default_frequency() -> u32 {
    1
}

impl Alert {
    /// Create a market-class price alert.
    #[must_use]
    pub fn market(asset_type: impl Into<String>, trigger_value: f64, condition: Condition) -> Self {
        let mut alert = Self::blank(AlertType::PriceThreshold, asset_type.into());
        alert.trigger_value = trigger_value;
        alert.condition = condition;
        alert
    }

    /// Create a position-class alert bound to `position_id`.
    #[must_use]
    pub fn for_position(
        alert_type: AlertType,
        asset_type: impl Into<String>,
        position_id: impl Into<String>,
    ) -> Self {
        let mut alert = Self::blank(alert_type, asset_type.into());
        alert.position_reference_id = Some(position_id.into());
        alert
    }

    fn blank(alert_type: AlertType, asset_type: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            alert_class: AlertClass::for_type(&alert_type),
            alert_type,
            asset_type,
            trigger_value: 0.0,
            condition: Condition::default(),
            notification_type: NotificationType::default(),
            level: AlertLevel::Normal,
            status: AlertStatus::Active,
            frequency: default_frequency(),
            counter: 0,
            evaluated_value: 0.0,
            position_reference_id: None,
            liquidation_distance: None,
            liquidation_price: None,
            travel_percent: None,
            notes: String::new(),
            created_at: Utc::now(),
            last_triggered: None,
        }
    }

    /// Check the class invariants.
    ///
    /// The class must be the one implied by the type, and a position
    /// reference must be present exactly for position-class alerts.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::InvalidAlert("empty id".to_string()));
        }

        let expected = AlertClass::for_type(&self.alert_type);
        if self.alert_class != expected {
            return Err(CoreError::InvalidAlert(format!(
                "{} alert {} must be {} class, got {}",
                self.alert_type, self.id, expected, self.alert_class
            )));
        }

        match (self.alert_class, self.position_reference_id.as_deref()) {
            (AlertClass::Position, None) | (AlertClass::Position, Some("")) => {
                Err(CoreError::InvalidAlert(format!(
                    "position alert {} has no position reference",
                    self.id
                )))
            }
            (AlertClass::Market, Some(position_id)) => Err(CoreError::InvalidAlert(format!(
                "market alert {} references position {}",
                self.id, position_id
            ))),
            _ => Ok(()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_type_normalize_variants() {
        assert_eq!(
            AlertType::normalize("travel_percent_alert"),
            Ok(AlertType::TravelPercentLiquid)
        );
        assert_eq!(
            AlertType::normalize("TRAVELPERCENT"),
            Ok(AlertType::TravelPercentLiquid)
        );
        assert_eq!(AlertType::normalize("Profit Alert"), Ok(AlertType::Profit));
        assert_eq!(AlertType::normalize("heat-index"), Ok(AlertType::HeatIndex));
        assert_eq!(
            AlertType::normalize("PriceThreshold"),
            Ok(AlertType::PriceThreshold)
        );
    }

    #[test]
    fn test_alert_type_unrecognized_passes_through() {
        assert_eq!(
            AlertType::normalize("Funding Rate"),
            Err("Funding Rate".to_string())
        );

        let parsed: AlertType = serde_json::from_str("\"Funding Rate\"").unwrap();
        assert_eq!(parsed, AlertType::Unrecognized("Funding Rate".to_string()));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"Funding Rate\"");
    }

    #[test]
    fn test_alert_type_deserializes_legacy_spelling() {
        let parsed: AlertType = serde_json::from_str("\"travel_percent_liquid\"").unwrap();
        assert_eq!(parsed, AlertType::TravelPercentLiquid);
        assert_eq!(
            serde_json::to_string(&parsed).unwrap(),
            "\"TravelPercentLiquid\""
        );
    }

    #[test]
    fn test_condition_is_met_inclusive() {
        assert!(Condition::Above.is_met(40_000.0, 40_000.0));
        assert!(Condition::Above.is_met(45_000.0, 40_000.0));
        assert!(!Condition::Above.is_met(39_999.0, 40_000.0));
        assert!(Condition::Below.is_met(100.0, 100.0));
        assert!(!Condition::Below.is_met(101.0, 100.0));
    }

    #[test]
    fn test_condition_parse() {
        assert_eq!(Condition::parse(" below "), Some(Condition::Below));
        assert_eq!(Condition::parse("Above"), Some(Condition::Above));
        assert_eq!(Condition::parse("sideways"), None);
        assert!("sideways".parse::<Condition>().is_err());
    }

    #[test]
    fn test_alert_class_derivation() {
        let market = Alert::market("BTC", 40_000.0, Condition::Above);
        assert_eq!(market.alert_class, AlertClass::Market);
        assert!(market.validate().is_ok());

        let position = Alert::for_position(AlertType::Profit, "ETH", "pos-1");
        assert_eq!(position.alert_class, AlertClass::Position);
        assert!(position.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_class_mismatch() {
        let mut alert = Alert::for_position(AlertType::HeatIndex, "ETH", "pos-1");
        alert.position_reference_id = None;
        assert!(matches!(alert.validate(), Err(CoreError::InvalidAlert(_))));

        let mut alert = Alert::market("BTC", 1.0, Condition::Below);
        alert.position_reference_id = Some("pos-1".to_string());
        assert!(alert.validate().is_err());

        let mut alert = Alert::market("BTC", 1.0, Condition::Below);
        alert.alert_class = AlertClass::Position;
        assert!(alert.validate().is_err());
    }

    #[test]
    fn test_level_actionable() {
        assert!(!AlertLevel::Normal.is_actionable());
        assert!(AlertLevel::Low.is_actionable());
        assert!(AlertLevel::Triggered.is_actionable());
        assert!(AlertLevel::Liquidated.is_actionable());
    }

    #[test]
    fn test_alert_deserializes_with_defaults() {
        let json = r#"{
            "id": "a1",
            "alert_type": "Profit",
            "alert_class": "Position",
            "asset_type": "SOL",
            "position_reference_id": "p1",
            "created_at": "2026-01-01T00:00:00Z"
        }"#;
        let alert: Alert = serde_json::from_str(json).unwrap();
        assert_eq!(alert.level, AlertLevel::Normal);
        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.frequency, 1);
        assert!(alert.validate().is_ok());
    }
}
