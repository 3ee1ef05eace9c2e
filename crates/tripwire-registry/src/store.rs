//! Alert persistence contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tripwire_core::{
    Alert, AlertClass, AlertLevel, AlertStatus, AlertType, Condition, NotificationType,
};

use crate::error::RegistryResult;

/// Storage for alert records.
///
/// Implementations are internally synchronized; every call is its own
/// atomic write.
pub trait AlertStore: Send + Sync {
    /// Insert a new record. Fails on a duplicate id.
    fn create(&self, alert: Alert) -> RegistryResult<()>;

    /// Apply a partial update. Returns the number of records changed (0 or 1).
    fn update(&self, id: &str, update: &AlertUpdate) -> RegistryResult<usize>;

    /// Remove a record. Returns whether it existed.
    fn delete(&self, id: &str) -> RegistryResult<bool>;

    /// All records, oldest first.
    fn list(&self) -> RegistryResult<Vec<Alert>>;

    fn get(&self, id: &str) -> RegistryResult<Option<Alert>>;

    /// Whether an alert of `alert_type` already exists for `position_id`.
    fn has_mapping(&self, position_id: &str, alert_type: &AlertType) -> RegistryResult<bool> {
        Ok(self.list()?.iter().any(|alert| {
            alert.position_reference_id.as_deref() == Some(position_id)
                && &alert.alert_type == alert_type
        }))
    }
}

/// Partial alert update.
///
/// Only fields that are `Some` are written. Deserializes from a partial
/// JSON field map; unknown fields are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<AlertType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_class: Option<AlertClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<NotificationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<AlertLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AlertStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluated_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidation_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidation_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<DateTime<Utc>>,
}

impl AlertUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write the present fields onto `alert`.
    pub fn apply(&self, alert: &mut Alert) {
        if let Some(alert_type) = &self.alert_type {
            alert.alert_type = alert_type.clone();
        }
        if let Some(alert_class) = self.alert_class {
            alert.alert_class = alert_class;
        }
        if let Some(trigger_value) = self.trigger_value {
            alert.trigger_value = trigger_value;
        }
        if let Some(condition) = self.condition {
            alert.condition = condition;
        }
        if let Some(notification_type) = self.notification_type {
            alert.notification_type = notification_type;
        }
        if let Some(level) = self.level {
            alert.level = level;
        }
        if let Some(status) = self.status {
            alert.status = status;
        }
        if let Some(frequency) = self.frequency {
            alert.frequency = frequency;
        }
        if let Some(counter) = self.counter {
            alert.counter = counter;
        }
        if let Some(evaluated_value) = self.evaluated_value {
            alert.evaluated_value = evaluated_value;
        }
        if self.liquidation_distance.is_some() {
            alert.liquidation_distance = self.liquidation_distance;
        }
        if self.liquidation_price.is_some() {
            alert.liquidation_price = self.liquidation_price;
        }
        if self.travel_percent.is_some() {
            alert.travel_percent = self.travel_percent;
        }
        if let Some(notes) = &self.notes {
            alert.notes = notes.clone();
        }
        if self.last_triggered.is_some() {
            alert.last_triggered = self.last_triggered;
        }
    }
}
