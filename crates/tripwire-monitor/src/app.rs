//! Application wiring.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use tripwire_config::ThresholdConfig;
use tripwire_core::{Clock, SystemClock};
use tripwire_notify::build_channel;
use tripwire_registry::{
    AlertRegistry, JsonFileAlertStore, JsonFilePositionStore, JsonFilePriceStore, PositionStore,
    PriceStore,
};
use tripwire_throttle::{NotificationThrottle, ThrottleSettings};

use crate::config::AppConfig;
use crate::error::MonitorResult;
use crate::loader::SnapshotLoader;
use crate::manager::AlertManager;
use crate::timers::DocumentTimerStore;

/// Main application.
pub struct Application {
    config: AppConfig,
    manager: AlertManager,
}

impl Application {
    /// Build file-backed stores and the configured channel.
    pub fn new(config: AppConfig) -> MonitorResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let thresholds = Arc::new(ThresholdConfig::new(config.threshold_path.clone()));
        if !thresholds.validate() {
            info!(
                path = %config.threshold_path.display(),
                "Threshold document missing or incomplete, defaults apply"
            );
        }

        let alert_store = Arc::new(JsonFileAlertStore::open(config.alert_store_path.clone())?);
        let registry = AlertRegistry::new(alert_store);

        let position_sources: Vec<Arc<dyn PositionStore>> = config
            .sources
            .positions
            .iter()
            .map(|s| {
                Arc::new(JsonFilePositionStore::new(s.name.clone(), s.path.clone()))
                    as Arc<dyn PositionStore>
            })
            .collect();
        let price_sources: Vec<Arc<dyn PriceStore>> = config
            .sources
            .prices
            .iter()
            .map(|s| {
                Arc::new(JsonFilePriceStore::new(s.name.clone(), s.path.clone()))
                    as Arc<dyn PriceStore>
            })
            .collect();
        let loader = SnapshotLoader::new(position_sources, price_sources, clock.clone())
            .with_timeout(config.sources.timeout())
            .with_retry(config.sources.retry_policy());

        let throttle = Arc::new(NotificationThrottle::new(
            clock.clone(),
            Arc::new(DocumentTimerStore::new(thresholds.clone())),
            ThrottleSettings::default(),
        ));

        let channel = build_channel(&config.notification)?;
        info!(channel = %channel.kind(), "Notification channel ready");

        let mut manager = AlertManager::new(registry, thresholds, loader, throttle, channel, clock);
        if let Some(path) = &config.telemetry.metrics_textfile {
            manager = manager.with_metrics_textfile(path.clone());
        }

        Ok(Self { config, manager })
    }

    pub fn manager(&self) -> &AlertManager {
        &self.manager
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the polling loop until ctrl-c.
    pub async fn run(&self) -> MonitorResult<()> {
        let cancel = CancellationToken::new();
        let signal_token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                signal_token.cancel();
            }
        });

        self.manager.run(self.config.poll_interval(), cancel).await
    }
}
