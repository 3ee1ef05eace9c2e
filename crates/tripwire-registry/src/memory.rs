//! In-memory repositories.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use tripwire_core::{Alert, Position, PriceQuote};

use crate::error::{RegistryError, RegistryResult, SourceResult};
use crate::sources::{PositionStore, PriceStore};
use crate::store::{AlertStore, AlertUpdate};

// ============================================================================
// MemoryAlertStore
// ============================================================================

/// Alert store kept in a concurrent map.
#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: DashMap<String, Alert>,
}

impl MemoryAlertStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

impl AlertStore for MemoryAlertStore {
    fn create(&self, alert: Alert) -> RegistryResult<()> {
        match self.alerts.entry(alert.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RegistryError::Duplicate(alert.id)),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(alert);
                Ok(())
            }
        }
    }

    fn update(&self, id: &str, update: &AlertUpdate) -> RegistryResult<usize> {
        match self.alerts.get_mut(id) {
            Some(mut alert) => {
                update.apply(&mut alert);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    fn delete(&self, id: &str) -> RegistryResult<bool> {
        Ok(self.alerts.remove(id).is_some())
    }

    fn list(&self) -> RegistryResult<Vec<Alert>> {
        let mut alerts: Vec<Alert> = self.alerts.iter().map(|e| e.value().clone()).collect();
        alerts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(alerts)
    }

    fn get(&self, id: &str) -> RegistryResult<Option<Alert>> {
        Ok(self.alerts.get(id).map(|e| e.value().clone()))
    }
}

// ============================================================================
// MemoryPositionStore
// ============================================================================

/// Position source holding a replaceable snapshot.
pub struct MemoryPositionStore {
    name: String,
    positions: RwLock<Vec<Position>>,
}

impl MemoryPositionStore {
    #[must_use]
    pub fn new(name: impl Into<String>, positions: Vec<Position>) -> Self {
        Self {
            name: name.into(),
            positions: RwLock::new(positions),
        }
    }

    /// Replace the snapshot.
    pub fn set_positions(&self, positions: Vec<Position>) {
        *self.positions.write() = positions;
    }

    /// Apply `f` to the position with `id`. Returns whether it was found.
    pub fn modify(&self, id: &str, f: impl FnOnce(&mut Position)) -> bool {
        let mut positions = self.positions.write();
        match positions.iter_mut().find(|p| p.id == id) {
            Some(position) => {
                f(position);
                true
            }
            None => false,
        }
    }

    pub fn positions(&self) -> Vec<Position> {
        self.positions.read().clone()
    }
}

#[async_trait]
impl PositionStore for MemoryPositionStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_positions(&self) -> SourceResult<Vec<Position>> {
        Ok(self.positions())
    }

    async fn link_alert(&self, position_id: &str, alert_id: &str) -> SourceResult<()> {
        self.modify(position_id, |p| p.alert_reference_id = Some(alert_id.to_string()));
        Ok(())
    }
}

// ============================================================================
// MemoryPriceStore
// ============================================================================

/// Price source keyed by asset symbol.
pub struct MemoryPriceStore {
    name: String,
    prices: DashMap<String, PriceQuote>,
}

impl MemoryPriceStore {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prices: DashMap::new(),
        }
    }

    pub fn set_price(&self, asset: &str, price: f64) {
        self.prices
            .insert(asset.to_string(), PriceQuote::new(asset, price));
    }

    pub fn remove_price(&self, asset: &str) {
        self.prices.remove(asset);
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_latest_price(&self, asset: &str) -> SourceResult<Option<PriceQuote>> {
        Ok(self.prices.get(asset).map(|e| e.value().clone()))
    }

    async fn latest_prices(&self) -> SourceResult<Vec<PriceQuote>> {
        Ok(self.prices.iter().map(|e| e.value().clone()).collect())
    }
}
