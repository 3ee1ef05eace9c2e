//! Throttle timer persistence in the threshold document.
//!
//! The document stores timers as Unix seconds; the throttle works in
//! milliseconds.

use std::sync::Arc;

use tripwire_config::{ThresholdConfig, ThresholdDocument};
use tripwire_throttle::{ThrottleError, ThrottleResult, ThrottleSettings, ThrottleTimers, TimerStore};

/// Writes throttle timers back into the threshold document.
pub struct DocumentTimerStore {
    config: Arc<ThresholdConfig>,
}

impl DocumentTimerStore {
    #[must_use]
    pub fn new(config: Arc<ThresholdConfig>) -> Self {
        Self { config }
    }
}

impl TimerStore for DocumentTimerStore {
    fn save_timers(&self, timers: &ThrottleTimers) -> ThrottleResult<()> {
        self.config
            .save_timers(
                timers.call_refractory_start.map(ms_to_secs),
                timers.snooze_start.map(ms_to_secs),
                timers.snooze_duration_secs,
            )
            .map_err(|e| ThrottleError::Persistence(e.to_string()))
    }
}

/// Timers recorded in `doc`. Negative or non-finite values are ignored.
pub fn timers_from_document(doc: &ThresholdDocument) -> ThrottleTimers {
    ThrottleTimers {
        call_refractory_start: doc.call_refractory_start.and_then(secs_to_ms),
        snooze_start: doc.snooze_start.and_then(secs_to_ms),
        snooze_duration_secs: doc.snooze_duration,
    }
}

/// Window lengths configured in `doc`.
pub fn settings_from_document(doc: &ThresholdDocument) -> ThrottleSettings {
    ThrottleSettings {
        cooldown_secs: doc.alert_cooldown_seconds,
        call_refractory_secs: doc.call_refractory_period,
        snooze_secs: doc.snooze_countdown,
    }
}

fn ms_to_secs(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

fn secs_to_ms(secs: f64) -> Option<u64> {
    (secs.is_finite() && secs >= 0.0).then(|| (secs * 1000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_timers_round_trip_through_document() {
        let dir = TempDir::new().unwrap();
        let config = Arc::new(ThresholdConfig::new(dir.path().join("thresholds.json")));
        config
            .update(json!({"alert_ranges": {"profit_ranges": {"low": 1, "medium": 2, "high": 3}}}))
            .unwrap();

        let store = DocumentTimerStore::new(config.clone());
        store
            .save_timers(&ThrottleTimers {
                call_refractory_start: Some(1_700_000_000_500),
                ..ThrottleTimers::default()
            })
            .unwrap();

        let doc = config.load();
        assert_eq!(doc.call_refractory_start, Some(1_700_000_000.5));
        assert_eq!(doc.snooze_start, None);
        assert_eq!(doc.thresholds(tripwire_config::BandMetric::Profit).medium, 2.0);

        let timers = timers_from_document(&doc);
        assert_eq!(timers.call_refractory_start, Some(1_700_000_000_500));
    }

    #[test]
    fn test_snooze_length_round_trips_through_document() {
        let dir = TempDir::new().unwrap();
        let config = Arc::new(ThresholdConfig::new(dir.path().join("thresholds.json")));
        let store = DocumentTimerStore::new(config.clone());

        let timers = ThrottleTimers {
            call_refractory_start: None,
            snooze_start: Some(1_700_000_000_000),
            snooze_duration_secs: Some(3600),
        };
        store.save_timers(&timers).unwrap();

        let doc = config.load();
        assert_eq!(doc.snooze_duration, Some(3600));
        assert_eq!(timers_from_document(&doc), timers);
    }

    #[test]
    fn test_invalid_timer_values_ignored() {
        let doc = ThresholdDocument {
            call_refractory_start: Some(-5.0),
            snooze_start: Some(f64::NAN),
            ..ThresholdDocument::default()
        };
        assert_eq!(timers_from_document(&doc), ThrottleTimers::default());
    }

    #[test]
    fn test_settings_from_document() {
        let doc = ThresholdDocument {
            alert_cooldown_seconds: 60,
            ..ThresholdDocument::default()
        };
        let settings = settings_from_document(&doc);
        assert_eq!(settings.cooldown_secs, 60);
        assert_eq!(settings.call_refractory_secs, 3600);
        assert_eq!(settings.snooze_secs, 300);
    }
}
