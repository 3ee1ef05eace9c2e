//! Per-cycle input loading.
//!
//! Every position and price source is read concurrently. Each read has a
//! timeout and is retried with backoff while the error is recoverable. A
//! failed source contributes nothing this cycle; the cycle is abandoned only
//! when no source at all succeeded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use tripwire_core::{retry_with_backoff, Clock, Position, PriceQuote, RetryPolicy};
use tripwire_engine::InputSnapshot;
use tripwire_registry::{PositionStore, PriceStore, SourceError, SourceResult};
use tripwire_telemetry::Metrics;

use crate::error::{MonitorError, MonitorResult};

/// Default per-call timeout.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the `InputSnapshot` shared by one cycle.
pub struct SnapshotLoader {
    position_sources: Vec<Arc<dyn PositionStore>>,
    price_sources: Vec<Arc<dyn PriceStore>>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl SnapshotLoader {
    #[must_use]
    pub fn new(
        position_sources: Vec<Arc<dyn PositionStore>>,
        price_sources: Vec<Arc<dyn PriceStore>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            position_sources,
            price_sources,
            clock,
            timeout: DEFAULT_SOURCE_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn position_sources(&self) -> &[Arc<dyn PositionStore>] {
        &self.position_sources
    }

    /// Read one position source with timeout and retry.
    pub async fn read_positions(&self, source: &dyn PositionStore) -> SourceResult<Vec<Position>> {
        retry_with_backoff(self.retry, "read_positions", || {
            with_timeout(source.name(), self.timeout, source.read_positions())
        })
        .await
    }

    /// Read one price source with timeout and retry.
    pub async fn read_prices(&self, source: &dyn PriceStore) -> SourceResult<Vec<PriceQuote>> {
        retry_with_backoff(self.retry, "read_prices", || {
            with_timeout(source.name(), self.timeout, source.latest_prices())
        })
        .await
    }

    /// Load positions and prices from every source.
    ///
    /// Fails with `InputsUnavailable` only when sources are configured and
    /// all of them failed.
    pub async fn load(&self) -> MonitorResult<InputSnapshot> {
        let position_reads = self
            .position_sources
            .iter()
            .map(|source| self.read_positions(source.as_ref()));
        let price_reads = self
            .price_sources
            .iter()
            .map(|source| self.read_prices(source.as_ref()));

        let (position_results, price_results) =
            tokio::join!(join_all(position_reads), join_all(price_reads));

        let mut failed = 0;
        let mut positions = Vec::new();
        for (source, result) in self.position_sources.iter().zip(position_results) {
            match result {
                Ok(mut batch) => positions.append(&mut batch),
                Err(e) => {
                    failed += 1;
                    source_failed(source.name(), &e);
                }
            }
        }

        let mut prices = Vec::new();
        for (source, result) in self.price_sources.iter().zip(price_results) {
            match result {
                Ok(mut batch) => prices.append(&mut batch),
                Err(e) => {
                    failed += 1;
                    source_failed(source.name(), &e);
                }
            }
        }

        let total = self.position_sources.len() + self.price_sources.len();
        if total > 0 && failed == total {
            return Err(MonitorError::InputsUnavailable { failed });
        }

        debug!(
            positions = positions.len(),
            prices = prices.len(),
            failed_sources = failed,
            "Inputs loaded"
        );
        Ok(InputSnapshot::new(positions, prices).with_loaded_at(self.clock.now()))
    }
}

async fn with_timeout<T>(
    source_name: &str,
    timeout: Duration,
    read: impl Future<Output = SourceResult<T>>,
) -> SourceResult<T> {
    match tokio::time::timeout(timeout, read).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout {
            source_name: source_name.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

fn source_failed(name: &str, error: &SourceError) {
    warn!(source = %name, error = %error, "Input source failed, skipping this cycle");
    Metrics::source_failed(name);
}
