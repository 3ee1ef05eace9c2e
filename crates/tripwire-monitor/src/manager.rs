//! AlertManager: one evaluation cycle end to end.
//!
//! Cycle phases: `Idle -> LoadInputs -> Evaluate -> Throttle -> Dispatch ->
//! Persist -> Idle`. Every active alert is evaluated against the same input
//! snapshot and its new state is written back whether or not it fires.
//! Admitted messages are combined and sent once per cycle, after all alerts
//! have been evaluated.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tripwire_config::{BandMetric, ThresholdConfig, ThresholdDocument};
use tripwire_core::{
    Alert, AlertClass, AlertLevel, AlertType, Clock, NotificationType, Recoverable,
};
use tripwire_engine::{
    combine_messages, format_alert_message, AlertEvaluator, InputSnapshot, LevelStateMachine,
};
use tripwire_notify::NotificationChannel;
use tripwire_registry::{AlertRegistry, AlertUpdate};
use tripwire_telemetry::Metrics;
use tripwire_throttle::{NotificationThrottle, SuppressReason, ThrottleDecision, ThrottleTimers};

use crate::error::MonitorResult;
use crate::loader::SnapshotLoader;
use crate::timers::{settings_from_document, timers_from_document};

/// Throttle key for the single outbound dispatch per cycle.
pub const CALL_CHANNEL_KEY: &str = "all_alerts";

// ============================================================================
// Cycle types
// ============================================================================

/// Where the manager is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CyclePhase {
    #[default]
    Idle,
    LoadInputs,
    Evaluate,
    Throttle,
    Dispatch,
    Persist,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::LoadInputs => "load_inputs",
            Self::Evaluate => "evaluate",
            Self::Throttle => "throttle",
            Self::Dispatch => "dispatch",
            Self::Persist => "persist",
        };
        write!(f, "{name}")
    }
}

/// What happened to the combined message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No alert was admitted.
    #[default]
    NothingToSend,
    Sent {
        dispatch_id: String,
    },
    Suppressed(SuppressReason),
    /// The channel failed; the refractory window was not consumed.
    Failed(String),
}

/// Summary of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Monitoring was disabled in the threshold document.
    pub skipped: bool,
    pub evaluated: usize,
    pub persisted: usize,
    /// Alerts whose state write failed or matched no record.
    pub failed: usize,
    pub actionable: usize,
    pub admitted: usize,
    /// Throttle suppressions during the cycle, including the dispatch gate.
    pub suppressed: u32,
    pub dispatch: DispatchOutcome,
}

/// One evaluated alert that reached an actionable level.
struct Actionable {
    alert: Alert,
    level: AlertLevel,
    message: String,
}

// ============================================================================
// AlertManager
// ============================================================================

/// Orchestrates evaluation, throttling, dispatch and persistence.
pub struct AlertManager {
    registry: AlertRegistry,
    thresholds: Arc<ThresholdConfig>,
    loader: SnapshotLoader,
    throttle: Arc<NotificationThrottle>,
    channel: Arc<dyn NotificationChannel>,
    clock: Arc<dyn Clock>,
    evaluator: AlertEvaluator,
    levels: LevelStateMachine,
    phase: RwLock<CyclePhase>,
    /// Timers last seen in the threshold document.
    synced_timers: Mutex<ThrottleTimers>,
    metrics_textfile: Option<PathBuf>,
}

impl AlertManager {
    /// Build a manager. Throttle windows and persisted timers are seeded
    /// from the current threshold document.
    pub fn new(
        registry: AlertRegistry,
        thresholds: Arc<ThresholdConfig>,
        loader: SnapshotLoader,
        throttle: Arc<NotificationThrottle>,
        channel: Arc<dyn NotificationChannel>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let doc = thresholds.load();
        let stored = timers_from_document(&doc);
        throttle.configure(settings_from_document(&doc));
        throttle.restore(stored);

        Self {
            registry,
            thresholds,
            loader,
            throttle,
            channel,
            clock,
            evaluator: AlertEvaluator::new(),
            levels: LevelStateMachine::new(),
            phase: RwLock::new(CyclePhase::Idle),
            synced_timers: Mutex::new(stored),
            metrics_textfile: None,
        }
    }

    /// Rewrite Prometheus metrics to `path` after every cycle of `run`.
    #[must_use]
    pub fn with_metrics_textfile(mut self, path: PathBuf) -> Self {
        self.metrics_textfile = Some(path);
        self
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.read()
    }

    pub fn registry(&self) -> &AlertRegistry {
        &self.registry
    }

    pub fn throttle(&self) -> &NotificationThrottle {
        &self.throttle
    }

    fn set_phase(&self, phase: CyclePhase) {
        *self.phase.write() = phase;
        debug!(%phase, "Cycle phase");
    }

    // ========================================================================
    // Cycle
    // ========================================================================

    /// Run one evaluation cycle.
    ///
    /// Per-alert failures are logged and counted; only a failure to list
    /// alerts or to load any input aborts the cycle.
    pub async fn run_cycle(&self) -> MonitorResult<CycleReport> {
        let started = Instant::now();
        let result = self.cycle().await;
        self.set_phase(CyclePhase::Idle);
        Metrics::cycle_duration(started.elapsed().as_secs_f64() * 1000.0);
        result
    }

    async fn cycle(&self) -> MonitorResult<CycleReport> {
        let mut report = CycleReport::default();

        if let Err(e) = self.throttle.tick() {
            warn!(error = %e, "Failed to persist elapsed throttle windows");
            Metrics::persistence_failed();
        }

        let doc = self.thresholds.load();
        if !doc.monitor_enabled() {
            info!("Alert monitoring disabled, skipping cycle");
            Metrics::cycle_skipped("disabled");
            report.skipped = true;
            return Ok(report);
        }
        self.sync_throttle(&doc);
        self.throttle.begin_cycle();

        self.set_phase(CyclePhase::LoadInputs);
        let snapshot = match self.loader.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "Inputs unavailable, skipping cycle");
                Metrics::cycle_skipped("inputs_unavailable");
                return Err(e);
            }
        };

        self.set_phase(CyclePhase::Evaluate);
        let alerts = self.registry.list()?;
        let mut actionable = Vec::new();
        let mut level_counts: Vec<(AlertLevel, usize)> = Vec::new();

        for alert in alerts.iter().filter(|a| a.is_active()) {
            report.evaluated += 1;
            let (update, message) = self.assess(alert, &doc, &snapshot);
            let level = update.level.unwrap_or_default();
            count_level(&mut level_counts, level);

            match self.registry.update(&alert.id, &update) {
                Ok(0) => {
                    warn!(alert_id = %alert.id, "Alert state write not confirmed, skipping");
                    report.failed += 1;
                    continue;
                }
                Ok(_) => report.persisted += 1,
                Err(e) => {
                    warn!(alert_id = %alert.id, error = %e, "Alert state write failed, skipping");
                    Metrics::persistence_failed();
                    report.failed += 1;
                    continue;
                }
            }

            if level.is_actionable() {
                actionable.push(Actionable {
                    alert: alert.clone(),
                    level,
                    message,
                });
            }
        }
        report.actionable = actionable.len();

        self.set_phase(CyclePhase::Throttle);
        let admitted = self.admit(actionable, doc.alert_cooldown_seconds);
        report.admitted = admitted.len();

        self.set_phase(CyclePhase::Dispatch);
        if !admitted.is_empty() {
            let lines: Vec<String> = admitted.iter().map(|a| a.message.clone()).collect();
            let message = combine_messages(&lines);
            report.dispatch = self.dispatch(&message, doc.call_refractory_period).await;
        }

        self.set_phase(CyclePhase::Persist);
        self.record_triggers(&admitted);
        let counts: Vec<(&str, usize)> = level_counts
            .iter()
            .map(|(level, count)| (level.as_str(), *count))
            .collect();
        Metrics::alert_levels(&counts);
        Metrics::snoozed(self.throttle.is_snoozed());

        report.suppressed = self.throttle.suppressed_count();
        info!(
            evaluated = report.evaluated,
            persisted = report.persisted,
            failed = report.failed,
            actionable = report.actionable,
            admitted = report.admitted,
            suppressed = report.suppressed,
            dispatch = ?report.dispatch,
            "Evaluation cycle complete"
        );
        Ok(report)
    }

    /// Pick up window lengths, and timers changed in the document since the
    /// last cycle (e.g. a snooze started from the command line).
    fn sync_throttle(&self, doc: &ThresholdDocument) {
        self.throttle.configure(settings_from_document(doc));
        let stored = timers_from_document(doc);
        let mut synced = self.synced_timers.lock();
        if stored != *synced {
            if stored != self.throttle.timers() {
                info!(?stored, "Throttle timers changed in threshold document");
                self.throttle.restore(stored);
            }
            *synced = stored;
        }
    }

    /// Evaluate one alert. Returns its state update and message line.
    fn assess(
        &self,
        alert: &Alert,
        doc: &ThresholdDocument,
        snapshot: &InputSnapshot,
    ) -> (AlertUpdate, String) {
        let enrichment = self.evaluator.enrich(alert, doc);
        let evaluation = self.evaluator.evaluate(alert, snapshot);
        Metrics::alert_evaluated(alert.alert_type.as_str(), evaluation.status.as_str());

        let mut notification_type = enrichment.notification_type;
        let (level, trigger_value) = match alert.alert_class {
            AlertClass::Market if !enrichment.enabled => {
                debug!(alert_id = %alert.id, asset = %alert.asset_type, "Price alert disabled for asset");
                (AlertLevel::Normal, enrichment.trigger_value)
            }
            AlertClass::Market => (
                self.levels
                    .market(enrichment.condition, evaluation.value, enrichment.trigger_value),
                enrichment.trigger_value,
            ),
            AlertClass::Position => match BandMetric::for_alert_type(&alert.alert_type) {
                Some(metric) => {
                    let band = doc.band(metric);
                    let outcome = self.levels.transition(
                        metric,
                        band,
                        evaluation.value,
                        enrichment.trigger_value,
                    );
                    if outcome.level.is_actionable() && band.routing_for(outcome.level).call {
                        notification_type = NotificationType::Call;
                    }
                    (outcome.level, outcome.trigger_value)
                }
                None => (AlertLevel::Normal, enrichment.trigger_value),
            },
        };

        let mut current = alert.clone();
        current.trigger_value = trigger_value;
        current.condition = enrichment.condition;
        let position = alert
            .position_reference_id
            .as_deref()
            .and_then(|id| snapshot.position(id));
        let message = format_alert_message(&current, level, evaluation.value, position);

        let update = AlertUpdate {
            trigger_value: Some(trigger_value),
            condition: Some(enrichment.condition),
            notification_type: Some(notification_type),
            level: Some(level),
            evaluated_value: Some(evaluation.value),
            liquidation_distance: evaluation.figures.map(|f| f.liquidation_distance),
            liquidation_price: evaluation.figures.map(|f| f.liquidation_price),
            travel_percent: evaluation.figures.map(|f| f.travel_percent),
            ..AlertUpdate::default()
        };

        debug!(
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            value = evaluation.value,
            status = %evaluation.status,
            %level,
            trigger_value,
            "Alert evaluated"
        );
        (update, message)
    }

    /// Apply the per-key cooldown gate to each actionable alert.
    fn admit(&self, actionable: Vec<Actionable>, cooldown_secs: u64) -> Vec<Actionable> {
        actionable
            .into_iter()
            .filter(|candidate| {
                let key = format!("{}:{}", candidate.alert.id, candidate.level);
                match self.throttle.may_fire(&key, cooldown_secs) {
                    ThrottleDecision::Allowed => true,
                    ThrottleDecision::Suppressed(reason) => {
                        Metrics::notification_suppressed(reason.as_str());
                        false
                    }
                }
            })
            .collect()
    }

    /// Send the combined message once, behind the refractory gate.
    async fn dispatch(&self, message: &str, refractory_secs: u64) -> DispatchOutcome {
        let kind = self.channel.kind();

        if let ThrottleDecision::Suppressed(reason) =
            self.throttle.check_call(CALL_CHANNEL_KEY, refractory_secs)
        {
            info!(%reason, channel = %kind, "Dispatch suppressed");
            Metrics::notification_suppressed(reason.as_str());
            return DispatchOutcome::Suppressed(reason);
        }

        match self.channel.send(message).await {
            Ok(dispatch_id) => {
                info!(%dispatch_id, channel = %kind, "Notification dispatched");
                Metrics::dispatch_sent(kind.as_str());
                if let Err(e) = self.throttle.record_call(CALL_CHANNEL_KEY) {
                    error!(error = %e, "Failed to persist refractory timer");
                    Metrics::persistence_failed();
                }
                DispatchOutcome::Sent { dispatch_id }
            }
            Err(e) => {
                error!(
                    error = %e,
                    recoverable = e.is_recoverable(),
                    channel = %kind,
                    "Notification dispatch failed"
                );
                Metrics::dispatch_failed(kind.as_str());
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }

    /// Bump counter and last_triggered on admitted alerts.
    fn record_triggers(&self, admitted: &[Actionable]) {
        let now = self.clock.now();
        for item in admitted {
            let update = AlertUpdate {
                counter: Some(item.alert.counter.saturating_add(1)),
                last_triggered: Some(now),
                ..AlertUpdate::default()
            };
            match self.registry.update(&item.alert.id, &update) {
                Ok(0) => {
                    warn!(alert_id = %item.alert.id, "Trigger bookkeeping write not confirmed");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(alert_id = %item.alert.id, error = %e, "Trigger bookkeeping write failed");
                    Metrics::persistence_failed();
                }
            }
        }
    }

    // ========================================================================
    // Bulk operations / operator commands
    // ========================================================================

    /// Create missing alerts from the threshold document.
    ///
    /// One market alert per enabled priced asset, and one position alert per
    /// position and enabled band. Existing mappings are left alone, so calling
    /// this twice creates nothing the second time. A position without a
    /// primary alert is linked to the first alert created for it.
    pub async fn create_all_alerts(&self) -> MonitorResult<usize> {
        let doc = self.thresholds.load();
        let existing = self.registry.list()?;
        let mut created = 0;

        for (asset, price) in &doc.alert_ranges.price_alerts {
            if !price.enabled {
                debug!(%asset, "Price alert disabled");
                continue;
            }
            let exists = existing.iter().any(|a| {
                a.alert_type == AlertType::PriceThreshold && a.asset_type == *asset
            });
            if exists {
                continue;
            }

            let mut alert = Alert::market(asset.clone(), price.trigger(), price.condition);
            alert.notification_type = self.evaluator.enrich(&alert, &doc).notification_type;
            self.registry.create(alert)?;
            created += 1;
        }

        for source in self.loader.position_sources() {
            let positions = match self.loader.read_positions(source.as_ref()).await {
                Ok(positions) => positions,
                Err(e) => {
                    warn!(source = %source.name(), error = %e, "Cannot read positions, skipping source");
                    Metrics::source_failed(source.name());
                    continue;
                }
            };

            for position in positions {
                let mut first_created = None;
                for metric in BandMetric::ALL {
                    if !doc.band(metric).enabled {
                        continue;
                    }
                    let alert_type = metric.alert_type();
                    if self.registry.has_mapping(&position.id, &alert_type)? {
                        continue;
                    }

                    let mut alert = Alert::for_position(
                        alert_type,
                        position.asset_type.clone(),
                        position.id.clone(),
                    );
                    let enrichment = self.evaluator.enrich(&alert, &doc);
                    alert.trigger_value = enrichment.trigger_value;
                    alert.condition = enrichment.condition;
                    alert.notification_type = enrichment.notification_type;

                    let id = self.registry.create(alert)?;
                    created += 1;
                    if first_created.is_none() {
                        first_created = Some(id);
                    }
                }

                if position.alert_reference_id.is_none() {
                    if let Some(alert_id) = first_created {
                        if let Err(e) = source.link_alert(&position.id, &alert_id).await {
                            warn!(position_id = %position.id, error = %e, "Failed to link alert to position");
                        }
                    }
                }
            }
        }

        info!(created, "Alerts created from configuration");
        Ok(created)
    }

    /// Merge a partial threshold document and apply its window lengths.
    pub fn update_thresholds(&self, partial: Value) -> MonitorResult<ThresholdDocument> {
        let doc = self.thresholds.update(partial)?;
        self.throttle.configure(settings_from_document(&doc));
        Ok(doc)
    }

    /// Delete every alert record.
    pub fn delete_all_alerts(&self) -> MonitorResult<usize> {
        Ok(self.registry.delete_all()?)
    }

    /// Start a snooze. Defaults to the document's `snooze_countdown`.
    /// Returns the snooze length in seconds.
    pub fn start_snooze(&self, seconds: Option<u64>) -> MonitorResult<u64> {
        let seconds = match seconds {
            Some(seconds) => seconds,
            None => self.thresholds.load().snooze_countdown,
        };
        self.throttle.start_snooze(seconds)?;
        Metrics::snoozed(true);
        Ok(seconds)
    }

    pub fn clear_snooze(&self) -> MonitorResult<()> {
        self.throttle.clear_snooze()?;
        Metrics::snoozed(false);
        Ok(())
    }

    // ========================================================================
    // Polling loop
    // ========================================================================

    /// Run cycles every `interval` until `cancel` fires.
    ///
    /// A cycle in progress always completes; the next one starts only after
    /// the previous one finished.
    pub async fn run(&self, interval: Duration, cancel: CancellationToken) -> MonitorResult<()> {
        info!(interval_secs = interval.as_secs(), "Alert monitor started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    info!("Shutdown requested, alert monitor stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!(error = %e, "Evaluation cycle failed");
                    }
                    self.export_metrics();
                }
            }
        }

        Ok(())
    }

    fn export_metrics(&self) {
        if let Some(path) = &self.metrics_textfile {
            if let Err(e) = Metrics::write_textfile(path) {
                warn!(path = %path.display(), error = %e, "Failed to write metrics file");
            }
        }
    }
}

fn count_level(counts: &mut Vec<(AlertLevel, usize)>, level: AlertLevel) {
    match counts.iter_mut().find(|(l, _)| *l == level) {
        Some((_, count)) => *count += 1,
        None => counts.push((level, 1)),
    }
}
