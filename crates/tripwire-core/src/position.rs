//! Read-only input snapshots: positions and price quotes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PositionType {
    #[default]
    #[serde(alias = "long", alias = "LONG")]
    Long,
    #[serde(alias = "short", alias = "SHORT")]
    Short,
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Snapshot of one open position.
///
/// Owned by the position subsystem. Derived figures (travel percent, PnL,
/// heat index) arrive precomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub asset_type: String,
    #[serde(default)]
    pub position_type: PositionType,
    #[serde(default)]
    pub entry_price: f64,
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub liquidation_price: f64,
    #[serde(default)]
    pub liquidation_distance: f64,
    #[serde(default)]
    pub collateral: f64,
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub leverage: f64,
    /// Percent of the way from entry to liquidation; -100 at the liquidation price.
    #[serde(default)]
    pub travel_percent: f64,
    #[serde(default)]
    pub pnl_after_fees: f64,
    #[serde(default)]
    pub heat_index: Option<f64>,
    #[serde(default)]
    pub current_heat_index: Option<f64>,
    #[serde(default)]
    pub wallet_name: Option<String>,
    #[serde(default)]
    pub alert_reference_id: Option<String>,
}

impl Position {
    /// Create a position with only identity fields set.
    #[must_use]
    pub fn new(id: impl Into<String>, asset_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            asset_type: asset_type.into(),
            position_type: PositionType::Long,
            entry_price: 0.0,
            current_price: 0.0,
            liquidation_price: 0.0,
            liquidation_distance: 0.0,
            collateral: 0.0,
            size: 0.0,
            leverage: 0.0,
            travel_percent: 0.0,
            pnl_after_fees: 0.0,
            heat_index: None,
            current_heat_index: None,
            wallet_name: None,
            alert_reference_id: None,
        }
    }

    /// Heat index, falling back to the alternate `current_heat_index`.
    pub fn effective_heat_index(&self) -> Option<f64> {
        self.heat_index.or(self.current_heat_index)
    }
}

/// Latest price observation for an asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub asset_type: String,
    pub current_price: f64,
    #[serde(default)]
    pub last_update_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: Option<String>,
}

impl PriceQuote {
    #[must_use]
    pub fn new(asset_type: impl Into<String>, current_price: f64) -> Self {
        Self {
            asset_type: asset_type.into(),
            current_price,
            last_update_time: None,
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heat_index_fallback() {
        let mut position = Position::new("p1", "BTC");
        assert_eq!(position.effective_heat_index(), None);

        position.current_heat_index = Some(14.0);
        assert_eq!(position.effective_heat_index(), Some(14.0));

        position.heat_index = Some(9.5);
        assert_eq!(position.effective_heat_index(), Some(9.5));
    }

    #[test]
    fn test_position_deserializes_sparse_record() {
        let json = r#"{"id": "p1", "asset_type": "ETH", "position_type": "SHORT", "travel_percent": -12.5}"#;
        let position: Position = serde_json::from_str(json).unwrap();
        assert_eq!(position.position_type, PositionType::Short);
        assert_eq!(position.travel_percent, -12.5);
        assert_eq!(position.pnl_after_fees, 0.0);
    }
}
