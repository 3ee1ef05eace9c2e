//! Input source contracts: positions and prices.

use async_trait::async_trait;

use tripwire_core::{Position, PriceQuote};

use crate::error::SourceResult;

/// Read access to open positions.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &str;

    async fn read_positions(&self) -> SourceResult<Vec<Position>>;

    /// Record `alert_id` as the position's primary alert.
    ///
    /// Sources that do not keep back-links ignore this.
    async fn link_alert(&self, _position_id: &str, _alert_id: &str) -> SourceResult<()> {
        Ok(())
    }
}

/// Read access to latest prices.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &str;

    /// Latest quote for `asset`, or `None` if the source has none.
    async fn get_latest_price(&self, asset: &str) -> SourceResult<Option<PriceQuote>>;

    /// Latest quote for every asset the source knows.
    async fn latest_prices(&self) -> SourceResult<Vec<PriceQuote>>;
}
