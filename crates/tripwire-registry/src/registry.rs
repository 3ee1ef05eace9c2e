//! Alert registry: validated CRUD over an injected store.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info};

use tripwire_core::{Alert, AlertType};

use crate::error::{RegistryError, RegistryResult};
use crate::store::{AlertStore, AlertUpdate};

/// Alert CRUD with class validation and logging.
#[derive(Clone)]
pub struct AlertRegistry {
    store: Arc<dyn AlertStore>,
}

impl AlertRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn AlertStore>) -> Self {
        Self { store }
    }

    /// Insert a new alert after checking its class invariants.
    pub fn create(&self, alert: Alert) -> RegistryResult<String> {
        alert.validate()?;
        let id = alert.id.clone();
        let alert_type = alert.alert_type.clone();
        self.store.create(alert)?;
        info!(alert_id = %id, %alert_type, "Alert created");
        Ok(id)
    }

    /// Apply a partial update. `Ok(0)` means no record matched.
    pub fn update(&self, id: &str, update: &AlertUpdate) -> RegistryResult<usize> {
        if update.is_empty() {
            return Ok(0);
        }
        match self.store.update(id, update) {
            Ok(0) => {
                debug!(alert_id = %id, "Alert update matched no record");
                Ok(0)
            }
            Ok(rows) => Ok(rows),
            Err(e) => {
                error!(alert_id = %id, error = %e, "Alert update failed");
                Err(e)
            }
        }
    }

    /// Apply a partial update given as a JSON field map.
    pub fn update_fields(&self, id: &str, fields: Value) -> RegistryResult<usize> {
        let update: AlertUpdate = serde_json::from_value(fields)
            .map_err(|e| RegistryError::InvalidUpdate(e.to_string()))?;
        self.update(id, &update)
    }

    pub fn delete(&self, id: &str) -> RegistryResult<bool> {
        let deleted = self.store.delete(id)?;
        if deleted {
            info!(alert_id = %id, "Alert deleted");
        }
        Ok(deleted)
    }

    /// Delete every alert. Returns how many were removed.
    pub fn delete_all(&self) -> RegistryResult<usize> {
        let mut deleted = 0;
        for alert in self.store.list()? {
            if self.store.delete(&alert.id)? {
                deleted += 1;
            }
        }
        info!(deleted, "All alerts deleted");
        Ok(deleted)
    }

    pub fn list(&self) -> RegistryResult<Vec<Alert>> {
        self.store.list()
    }

    pub fn get(&self, id: &str) -> RegistryResult<Option<Alert>> {
        self.store.get(id)
    }

    pub fn has_mapping(&self, position_id: &str, alert_type: &AlertType) -> RegistryResult<bool> {
        self.store.has_mapping(position_id, alert_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAlertStore;
    use serde_json::json;
    use tripwire_core::{AlertClass, AlertLevel, Condition};

    fn registry() -> AlertRegistry {
        AlertRegistry::new(Arc::new(MemoryAlertStore::new()))
    }

    #[test]
    fn test_create_rejects_position_alert_without_reference() {
        let registry = registry();
        let mut alert = Alert::for_position(AlertType::Profit, "BTC", "p1");
        alert.position_reference_id = None;

        assert!(matches!(
            registry.create(alert),
            Err(RegistryError::InvalidAlert(_))
        ));
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_create_rejects_market_alert_with_reference() {
        let registry = registry();
        let mut alert = Alert::market("BTC", 1.0, Condition::Above);
        alert.position_reference_id = Some("p1".to_string());
        assert!(registry.create(alert).is_err());

        let mut alert = Alert::market("BTC", 1.0, Condition::Above);
        alert.alert_class = AlertClass::Position;
        alert.position_reference_id = Some("p1".to_string());
        assert!(registry.create(alert).is_err());
    }

    #[test]
    fn test_update_fields_partial_map() {
        let registry = registry();
        let id = registry
            .create(Alert::for_position(AlertType::HeatIndex, "ETH", "p1"))
            .unwrap();

        let rows = registry
            .update_fields(&id, json!({"level": "High", "evaluated_value": 21.0}))
            .unwrap();
        assert_eq!(rows, 1);

        let alert = registry.get(&id).unwrap().unwrap();
        assert_eq!(alert.level, AlertLevel::High);
        assert_eq!(alert.evaluated_value, 21.0);
        assert_eq!(alert.asset_type, "ETH");

        assert!(matches!(
            registry.update_fields(&id, json!({"bogus": 1})),
            Err(RegistryError::InvalidUpdate(_))
        ));
    }

    #[test]
    fn test_empty_update_is_zero_rows() {
        let registry = registry();
        let id = registry
            .create(Alert::market("BTC", 1.0, Condition::Below))
            .unwrap();
        assert_eq!(registry.update(&id, &AlertUpdate::default()).unwrap(), 0);
    }

    #[test]
    fn test_delete_all() {
        let registry = registry();
        registry
            .create(Alert::market("BTC", 1.0, Condition::Below))
            .unwrap();
        registry
            .create(Alert::for_position(AlertType::Profit, "BTC", "p1"))
            .unwrap();

        assert_eq!(registry.delete_all().unwrap(), 2);
        assert!(registry.list().unwrap().is_empty());
        assert!(!registry.has_mapping("p1", &AlertType::Profit).unwrap());
    }
}
