//! Per-cycle input snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use tripwire_core::{Position, PriceQuote};

/// Positions and prices shared by every alert in one cycle.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    positions: HashMap<String, Position>,
    prices: HashMap<String, PriceQuote>,
    loaded_at: Option<DateTime<Utc>>,
}

impl InputSnapshot {
    /// Build a snapshot. Later duplicates of a position id or asset replace
    /// earlier ones.
    #[must_use]
    pub fn new(positions: Vec<Position>, prices: Vec<PriceQuote>) -> Self {
        Self {
            positions: positions.into_iter().map(|p| (p.id.clone(), p)).collect(),
            prices: prices
                .into_iter()
                .map(|q| (q.asset_type.clone(), q))
                .collect(),
            loaded_at: None,
        }
    }

    #[must_use]
    pub fn with_loaded_at(mut self, loaded_at: DateTime<Utc>) -> Self {
        self.loaded_at = Some(loaded_at);
        self
    }

    pub fn position(&self, id: &str) -> Option<&Position> {
        self.positions.get(id)
    }

    pub fn price(&self, asset: &str) -> Option<&PriceQuote> {
        self.prices.get(asset)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn price_count(&self) -> usize {
        self.prices.len()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}
