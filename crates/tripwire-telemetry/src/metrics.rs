//! Prometheus metrics for the alert monitor.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use std::path::Path;

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram, register_int_counter,
    register_int_gauge, CounterVec, Encoder, GaugeVec, Histogram, IntCounter, IntGauge,
    TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Alerts evaluated.
/// Labels: alert_type, status (found/missing_position/...)
pub static ALERTS_EVALUATED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tripwire_alerts_evaluated_total",
        "Total alert evaluations",
        &["alert_type", "status"]
    )
    .unwrap()
});

/// Number of alerts currently at each level.
pub static ALERT_LEVEL: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "tripwire_alert_level",
        "Alerts currently at each level",
        &["level"]
    )
    .unwrap()
});

/// Notifications suppressed by the throttle.
/// Labels: reason (snoozed/cooldown/refractory)
pub static NOTIFICATIONS_SUPPRESSED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tripwire_notifications_suppressed_total",
        "Notifications suppressed by throttling",
        &["reason"]
    )
    .unwrap()
});

/// Dispatch attempts.
/// Labels: channel, outcome (sent/failed)
pub static DISPATCH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tripwire_dispatch_total",
        "Notification dispatch attempts",
        &["channel", "outcome"]
    )
    .unwrap()
});

/// Evaluation cycle duration in milliseconds.
pub static CYCLE_DURATION_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "tripwire_cycle_duration_ms",
        "Evaluation cycle duration in milliseconds",
        vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 30000.0]
    )
    .unwrap()
});

/// Cycles skipped (monitor disabled or inputs unavailable).
pub static CYCLES_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tripwire_cycles_skipped_total",
        "Evaluation cycles skipped",
        &["reason"]
    )
    .unwrap()
});

/// Input source read failures.
pub static SOURCE_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tripwire_source_failures_total",
        "Position or price source read failures",
        &["source"]
    )
    .unwrap()
});

/// Failed alert or timer writes.
pub static PERSISTENCE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "tripwire_persistence_failures_total",
        "Failed alert or timer writes"
    )
    .unwrap()
});

/// Snooze state (1 = snoozed).
pub static SNOOZED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("tripwire_snoozed", "Notification snooze active (1=snoozed)").unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record one alert evaluation.
    pub fn alert_evaluated(alert_type: &str, status: &str) {
        ALERTS_EVALUATED_TOTAL
            .with_label_values(&[alert_type, status])
            .inc();
    }

    /// Replace the per-level alert counts.
    pub fn alert_levels(counts: &[(&str, usize)]) {
        ALERT_LEVEL.reset();
        for (level, count) in counts {
            ALERT_LEVEL.with_label_values(&[level]).set(*count as f64);
        }
    }

    /// Record a suppressed notification.
    pub fn notification_suppressed(reason: &str) {
        NOTIFICATIONS_SUPPRESSED_TOTAL
            .with_label_values(&[reason])
            .inc();
    }

    /// Record a successful dispatch.
    pub fn dispatch_sent(channel: &str) {
        DISPATCH_TOTAL.with_label_values(&[channel, "sent"]).inc();
    }

    /// Record a failed dispatch.
    pub fn dispatch_failed(channel: &str) {
        DISPATCH_TOTAL.with_label_values(&[channel, "failed"]).inc();
    }

    /// Record cycle duration.
    pub fn cycle_duration(duration_ms: f64) {
        CYCLE_DURATION_MS.observe(duration_ms);
    }

    /// Record a skipped cycle.
    pub fn cycle_skipped(reason: &str) {
        CYCLES_SKIPPED_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a source read failure.
    pub fn source_failed(source: &str) {
        SOURCE_FAILURES_TOTAL.with_label_values(&[source]).inc();
    }

    /// Record a failed write.
    pub fn persistence_failed() {
        PERSISTENCE_FAILURES_TOTAL.inc();
    }

    /// Set snooze state.
    pub fn snoozed(active: bool) {
        SNOOZED.set(i64::from(active));
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Render the default registry in Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }

    /// Write the rendered metrics to `path` for a textfile collector.
    pub fn write_textfile(path: &Path) -> TelemetryResult<()> {
        let rendered = Self::render()?;
        tripwire_core::write_atomic(path, rendered.as_bytes())?;
        Ok(())
    }
}
