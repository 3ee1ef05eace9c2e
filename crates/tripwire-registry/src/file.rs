//! JSON file repositories.
//!
//! Alerts are kept in one JSON array rewritten atomically on every change.
//! Position and price files are read fresh on every call and never written.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use tripwire_core::{write_atomic, Alert, Position, PriceQuote};

use crate::error::{RegistryError, RegistryResult, SourceResult};
use crate::sources::{PositionStore, PriceStore};
use crate::store::{AlertStore, AlertUpdate};

// ============================================================================
// JsonFileAlertStore
// ============================================================================

/// Alert store persisted to a JSON file.
pub struct JsonFileAlertStore {
    path: PathBuf,
    alerts: Mutex<Vec<Alert>>,
}

impl JsonFileAlertStore {
    /// Open the store, loading existing records if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> RegistryResult<Self> {
        let path = path.into();
        let alerts = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str::<Vec<Alert>>(&content)?
            }
        } else {
            Vec::new()
        };

        info!(path = %path.display(), count = alerts.len(), "Alert store opened");
        Ok(Self {
            path,
            alerts: Mutex::new(alerts),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` on a copy of the records and commit it only if the file
    /// write succeeds.
    fn mutate<T>(&self, f: impl FnOnce(&mut Vec<Alert>) -> RegistryResult<T>) -> RegistryResult<T> {
        let mut alerts = self.alerts.lock();
        let mut next = alerts.clone();
        let result = f(&mut next)?;

        let bytes = serde_json::to_vec_pretty(&next)?;
        write_atomic(&self.path, &bytes)?;
        *alerts = next;
        Ok(result)
    }
}

impl AlertStore for JsonFileAlertStore {
    fn create(&self, alert: Alert) -> RegistryResult<()> {
        self.mutate(|alerts| {
            if alerts.iter().any(|a| a.id == alert.id) {
                return Err(RegistryError::Duplicate(alert.id));
            }
            alerts.push(alert);
            Ok(())
        })
    }

    fn update(&self, id: &str, update: &AlertUpdate) -> RegistryResult<usize> {
        if !self.alerts.lock().iter().any(|a| a.id == id) {
            return Ok(0);
        }
        self.mutate(|alerts| {
            let mut rows = 0;
            for alert in alerts.iter_mut().filter(|a| a.id == id) {
                update.apply(alert);
                rows += 1;
            }
            Ok(rows)
        })
    }

    fn delete(&self, id: &str) -> RegistryResult<bool> {
        if !self.alerts.lock().iter().any(|a| a.id == id) {
            return Ok(false);
        }
        self.mutate(|alerts| {
            let before = alerts.len();
            alerts.retain(|a| a.id != id);
            Ok(alerts.len() != before)
        })
    }

    fn list(&self) -> RegistryResult<Vec<Alert>> {
        Ok(self.alerts.lock().clone())
    }

    fn get(&self, id: &str) -> RegistryResult<Option<Alert>> {
        Ok(self.alerts.lock().iter().find(|a| a.id == id).cloned())
    }
}

// ============================================================================
// JsonFilePositionStore / JsonFilePriceStore
// ============================================================================

/// Positions read from a JSON array file.
pub struct JsonFilePositionStore {
    name: String,
    path: PathBuf,
}

impl JsonFilePositionStore {
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl PositionStore for JsonFilePositionStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_positions(&self) -> SourceResult<Vec<Position>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let positions: Vec<Position> = serde_json::from_str(&content)?;
        debug!(source = %self.name, count = positions.len(), "Positions read");
        Ok(positions)
    }
}

/// Prices read from a JSON array file of quotes.
pub struct JsonFilePriceStore {
    name: String,
    path: PathBuf,
}

impl JsonFilePriceStore {
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    async fn read_quotes(&self) -> SourceResult<Vec<PriceQuote>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl PriceStore for JsonFilePriceStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_latest_price(&self, asset: &str) -> SourceResult<Option<PriceQuote>> {
        let quotes = self.read_quotes().await?;
        Ok(quotes
            .into_iter()
            .filter(|q| q.asset_type == asset)
            .max_by(|a, b| a.last_update_time.cmp(&b.last_update_time)))
    }

    /// Newest quote per asset, ordered by asset.
    async fn latest_prices(&self) -> SourceResult<Vec<PriceQuote>> {
        let quotes = self.read_quotes().await?;
        let mut newest: BTreeMap<String, PriceQuote> = BTreeMap::new();
        for quote in quotes {
            match newest.get(&quote.asset_type) {
                Some(existing) if existing.last_update_time > quote.last_update_time => {}
                _ => {
                    newest.insert(quote.asset_type.clone(), quote);
                }
            }
        }
        debug!(source = %self.name, count = newest.len(), "Prices read");
        Ok(newest.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use tempfile::TempDir;
    use tripwire_core::{AlertLevel, AlertType, Condition, Recoverable};

    #[test]
    fn test_alert_store_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("alerts.json");

        let alert = Alert::for_position(AlertType::HeatIndex, "SOL", "p9");
        let id = alert.id.clone();
        {
            let store = JsonFileAlertStore::open(&path).unwrap();
            store.create(alert).unwrap();
            store
                .create(Alert::market("BTC", 40_000.0, Condition::Above))
                .unwrap();
            let update = AlertUpdate {
                level: Some(AlertLevel::Medium),
                evaluated_value: Some(17.0),
                ..Default::default()
            };
            assert_eq!(store.update(&id, &update).unwrap(), 1);
        }

        let reopened = JsonFileAlertStore::open(&path).unwrap();
        let alerts = reopened.list().unwrap();
        assert_eq!(alerts.len(), 2);
        let stored = reopened.get(&id).unwrap().unwrap();
        assert_eq!(stored.level, AlertLevel::Medium);
        assert_eq!(stored.evaluated_value, 17.0);
        assert!(reopened.has_mapping("p9", &AlertType::HeatIndex).unwrap());
    }

    #[test]
    fn test_alert_store_missing_id_is_zero_rows() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileAlertStore::open(temp_dir.path().join("alerts.json")).unwrap();
        assert_eq!(store.update("nope", &AlertUpdate::default()).unwrap(), 0);
        assert!(!store.delete("nope").unwrap());
        assert!(!temp_dir.path().join("alerts.json").exists());
    }

    #[tokio::test]
    async fn test_price_file_newest_quote_wins() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prices.json");
        std::fs::write(
            &path,
            r#"[
                {"asset_type": "BTC", "current_price": 44000, "last_update_time": "2026-01-01T00:00:00Z"},
                {"asset_type": "BTC", "current_price": 45000, "last_update_time": "2026-01-01T00:05:00Z"},
                {"asset_type": "ETH", "current_price": 2500}
            ]"#,
        )
        .unwrap();

        let store = JsonFilePriceStore::new("file", &path);
        let btc = store.get_latest_price("BTC").await.unwrap().unwrap();
        assert_eq!(btc.current_price, 45_000.0);
        assert!(store.get_latest_price("SOL").await.unwrap().is_none());

        let all = store.latest_prices().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].asset_type, "BTC");
        assert_eq!(all[0].current_price, 45_000.0);
        assert_eq!(all[1].asset_type, "ETH");
    }

    #[tokio::test]
    async fn test_missing_position_file_is_not_recoverable() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFilePositionStore::new("file", temp_dir.path().join("absent.json"));

        let err = store.read_positions().await.unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
        assert!(!err.is_recoverable());
    }
}
