//! NotificationThrottle: cooldown, call refractory and snooze gates.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use tripwire_core::Clock;

use crate::error::ThrottleResult;
use crate::state::{window_elapsed, ThrottleState, ThrottleTimers};

// ============================================================================
// Decisions
// ============================================================================

/// Why a notification was held back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuppressReason {
    /// Operator snooze is active.
    Snoozed,
    /// The same key fired within its cooldown.
    Cooldown,
    /// A call went out within the refractory period.
    Refractory,
}

impl SuppressReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snoozed => "snoozed",
            Self::Cooldown => "cooldown",
            Self::Refractory => "refractory",
        }
    }
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Suppressed(SuppressReason),
}

impl ThrottleDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Which windows `tick` closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub refractory_cleared: bool,
    pub snooze_cleared: bool,
}

impl TickOutcome {
    pub fn changed(&self) -> bool {
        self.refractory_cleared || self.snooze_cleared
    }
}

// ============================================================================
// Settings / persistence seam
// ============================================================================

/// Window lengths in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleSettings {
    pub cooldown_secs: u64,
    pub call_refractory_secs: u64,
    pub snooze_secs: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: 900,
            call_refractory_secs: 3600,
            snooze_secs: 300,
        }
    }
}

/// Persists the refractory and snooze timers.
pub trait TimerStore: Send + Sync {
    fn save_timers(&self, timers: &ThrottleTimers) -> ThrottleResult<()>;
}

/// Timer store that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTimerStore;

impl TimerStore for NoopTimerStore {
    fn save_timers(&self, _timers: &ThrottleTimers) -> ThrottleResult<()> {
        Ok(())
    }
}

// ============================================================================
// NotificationThrottle
// ============================================================================

/// Decides whether a notification may go out now.
///
/// Thread-safe: state is behind a mutex that is never held across timer
/// persistence.
pub struct NotificationThrottle {
    clock: Arc<dyn Clock>,
    timer_store: Arc<dyn TimerStore>,
    settings: RwLock<ThrottleSettings>,
    state: Mutex<ThrottleState>,
}

impl NotificationThrottle {
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        timer_store: Arc<dyn TimerStore>,
        settings: ThrottleSettings,
    ) -> Self {
        let state = ThrottleState {
            snooze_duration_secs: settings.snooze_secs,
            ..ThrottleState::default()
        };
        Self {
            clock,
            timer_store,
            settings: RwLock::new(settings),
            state: Mutex::new(state),
        }
    }

    /// Seed timers loaded from persistent storage.
    ///
    /// A snooze without a stored length runs for the configured default.
    pub fn restore(&self, timers: ThrottleTimers) {
        let default_snooze_secs = self.settings.read().snooze_secs;
        let mut state = self.state.lock();
        state.call_refractory_start = timers.call_refractory_start;
        state.snooze_start = timers.snooze_start;
        state.snooze_duration_secs = match timers.snooze_start {
            Some(_) => timers.snooze_duration_secs.unwrap_or(default_snooze_secs),
            None => default_snooze_secs,
        };
        if timers.call_refractory_start.is_some() || timers.snooze_start.is_some() {
            info!(?timers, "Throttle timers restored");
        }
    }

    /// Replace window lengths, e.g. after the threshold document changed.
    ///
    /// An active snooze keeps the length it was started with.
    pub fn configure(&self, settings: ThrottleSettings) {
        *self.settings.write() = settings;
        let mut state = self.state.lock();
        if state.snooze_start.is_none() {
            state.snooze_duration_secs = settings.snooze_secs;
        }
    }

    pub fn settings(&self) -> ThrottleSettings {
        *self.settings.read()
    }

    /// Per-key cooldown gate.
    ///
    /// Allowed iff the key has not been admitted within `cooldown_secs`;
    /// an allowed decision stamps the key.
    pub fn may_fire(&self, key: &str, cooldown_secs: u64) -> ThrottleDecision {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();

        if state.is_snoozed(now) {
            state.suppressed_count += 1;
            debug!(key, "Notification suppressed: snoozed");
            return ThrottleDecision::Suppressed(SuppressReason::Snoozed);
        }

        if let Some(&last) = state.last_triggered.get(key) {
            if !window_elapsed(last, now, cooldown_secs) {
                state.suppressed_count += 1;
                debug!(
                    key,
                    since_ms = now.saturating_sub(last),
                    cooldown_secs,
                    "Notification suppressed: cooldown"
                );
                return ThrottleDecision::Suppressed(SuppressReason::Cooldown);
            }
        }

        state.last_triggered.insert(key.to_string(), now);
        ThrottleDecision::Allowed
    }

    /// Channel gate without side effects on success.
    ///
    /// Suppressed while snoozed, while the global refractory window is
    /// open, or when `channel_key` dispatched within `refractory_secs`.
    pub fn check_call(&self, channel_key: &str, refractory_secs: u64) -> ThrottleDecision {
        let now = self.clock.now_ms();
        let mut state = self.state.lock();

        let reason = if state.is_snoozed(now) {
            Some(SuppressReason::Snoozed)
        } else if state
            .call_refractory_start
            .is_some_and(|start| !window_elapsed(start, now, refractory_secs))
        {
            Some(SuppressReason::Refractory)
        } else if state
            .last_call_triggered
            .get(channel_key)
            .is_some_and(|&last| !window_elapsed(last, now, refractory_secs))
        {
            Some(SuppressReason::Refractory)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                state.suppressed_count += 1;
                debug!(channel_key, %reason, "Call suppressed");
                ThrottleDecision::Suppressed(reason)
            }
            None => ThrottleDecision::Allowed,
        }
    }

    /// Stamp a successful dispatch and open the refractory window.
    pub fn record_call(&self, channel_key: &str) -> ThrottleResult<()> {
        let now = self.clock.now_ms();
        let timers = {
            let mut state = self.state.lock();
            state.last_call_triggered.insert(channel_key.to_string(), now);
            state.call_refractory_start = Some(now);
            state.timers()
        };
        info!(channel_key, "Call recorded, refractory window started");
        self.timer_store.save_timers(&timers)
    }

    /// `check_call` followed by `record_call` when allowed.
    pub fn may_call(&self, channel_key: &str, refractory_secs: u64) -> ThrottleDecision {
        let decision = self.check_call(channel_key, refractory_secs);
        if decision.is_allowed() {
            if let Err(e) = self.record_call(channel_key) {
                warn!(error = %e, "Call recorded in memory only");
            }
        }
        decision
    }

    /// Suppress everything for `duration_secs`.
    pub fn start_snooze(&self, duration_secs: u64) -> ThrottleResult<()> {
        let now = self.clock.now_ms();
        let timers = {
            let mut state = self.state.lock();
            state.snooze_start = Some(now);
            state.snooze_duration_secs = duration_secs;
            state.timers()
        };
        info!(duration_secs, "Snooze started");
        self.timer_store.save_timers(&timers)
    }

    pub fn clear_snooze(&self) -> ThrottleResult<()> {
        let timers = {
            let mut state = self.state.lock();
            state.snooze_start = None;
            state.snooze_duration_secs = self.settings.read().snooze_secs;
            state.timers()
        };
        info!("Snooze cleared");
        self.timer_store.save_timers(&timers)
    }

    pub fn is_snoozed(&self) -> bool {
        let now = self.clock.now_ms();
        self.state.lock().is_snoozed(now)
    }

    /// Close elapsed windows. Persists timers when anything changed.
    pub fn tick(&self) -> ThrottleResult<TickOutcome> {
        let now = self.clock.now_ms();
        let settings = self.settings();
        let (outcome, timers) = {
            let mut state = self.state.lock();
            let mut outcome = TickOutcome::default();

            if let Some(start) = state.call_refractory_start {
                if window_elapsed(start, now, settings.call_refractory_secs) {
                    state.call_refractory_start = None;
                    outcome.refractory_cleared = true;
                }
            }
            if let Some(start) = state.snooze_start {
                if window_elapsed(start, now, state.snooze_duration_secs) {
                    state.snooze_start = None;
                    state.snooze_duration_secs = settings.snooze_secs;
                    outcome.snooze_cleared = true;
                }
            }
            (outcome, state.timers())
        };

        if outcome.changed() {
            info!(
                refractory_cleared = outcome.refractory_cleared,
                snooze_cleared = outcome.snooze_cleared,
                "Throttle windows elapsed"
            );
            self.timer_store.save_timers(&timers)?;
        }
        Ok(outcome)
    }

    /// Reset the per-cycle suppression counter, returning its old value.
    pub fn begin_cycle(&self) -> u32 {
        std::mem::take(&mut self.state.lock().suppressed_count)
    }

    pub fn suppressed_count(&self) -> u32 {
        self.state.lock().suppressed_count
    }

    pub fn timers(&self) -> ThrottleTimers {
        self.state.lock().timers()
    }

    /// Copy of the full state.
    pub fn snapshot(&self) -> ThrottleState {
        self.state.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ThrottleError;
    use tripwire_core::ManualClock;

    const BASE_TIME: u64 = 1_700_000_000_000;

    /// Timer store that remembers every save.
    #[derive(Default)]
    struct RecordingTimerStore {
        saved: Mutex<Vec<ThrottleTimers>>,
        fail: bool,
    }

    impl TimerStore for RecordingTimerStore {
        fn save_timers(&self, timers: &ThrottleTimers) -> ThrottleResult<()> {
            if self.fail {
                return Err(ThrottleError::Persistence("disk full".to_string()));
            }
            self.saved.lock().push(*timers);
            Ok(())
        }
    }

    fn setup() -> (Arc<ManualClock>, Arc<RecordingTimerStore>, NotificationThrottle) {
        let clock = ManualClock::shared(BASE_TIME);
        let store = Arc::new(RecordingTimerStore::default());
        let throttle =
            NotificationThrottle::new(clock.clone(), store.clone(), ThrottleSettings::default());
        (clock, store, throttle)
    }

    #[test]
    fn test_cooldown_suppresses_second_fire() {
        let (clock, _, throttle) = setup();

        assert_eq!(throttle.may_fire("a:Low", 900), ThrottleDecision::Allowed);
        clock.advance_secs(899);
        assert_eq!(
            throttle.may_fire("a:Low", 900),
            ThrottleDecision::Suppressed(SuppressReason::Cooldown)
        );
        assert_eq!(throttle.suppressed_count(), 1);

        clock.advance_secs(1);
        assert_eq!(throttle.may_fire("a:Low", 900), ThrottleDecision::Allowed);
        assert_eq!(throttle.suppressed_count(), 1);
    }

    #[test]
    fn test_cooldown_is_per_key() {
        let (_, _, throttle) = setup();
        assert!(throttle.may_fire("a:Low", 900).is_allowed());
        assert!(throttle.may_fire("a:Medium", 900).is_allowed());
        assert!(throttle.may_fire("b:Low", 900).is_allowed());
        assert_eq!(throttle.suppressed_count(), 0);
    }

    #[test]
    fn test_suppressed_cooldown_does_not_extend_window() {
        let (clock, _, throttle) = setup();
        assert!(throttle.may_fire("k", 900).is_allowed());
        clock.advance_secs(600);
        assert!(!throttle.may_fire("k", 900).is_allowed());
        clock.advance_secs(300);
        assert!(throttle.may_fire("k", 900).is_allowed());
    }

    #[test]
    fn test_snooze_suppresses_with_snoozed_reason() {
        let (clock, store, throttle) = setup();
        throttle.start_snooze(300).unwrap();

        assert_eq!(
            throttle.may_fire("fresh", 900),
            ThrottleDecision::Suppressed(SuppressReason::Snoozed)
        );
        assert_eq!(
            throttle.check_call("all_alerts", 3600),
            ThrottleDecision::Suppressed(SuppressReason::Snoozed)
        );
        assert_eq!(throttle.suppressed_count(), 2);
        assert_eq!(
            store.saved.lock().last().unwrap().snooze_start,
            Some(BASE_TIME)
        );

        clock.advance_secs(300);
        assert!(!throttle.is_snoozed());
        let outcome = throttle.tick().unwrap();
        assert!(outcome.snooze_cleared);
        assert_eq!(throttle.timers().snooze_start, None);
        assert!(throttle.may_fire("fresh", 900).is_allowed());
    }

    #[test]
    fn test_clear_snooze() {
        let (_, store, throttle) = setup();
        throttle.start_snooze(600).unwrap();
        assert!(throttle.is_snoozed());

        throttle.clear_snooze().unwrap();
        assert!(!throttle.is_snoozed());
        assert_eq!(store.saved.lock().last().unwrap().snooze_start, None);
        assert!(throttle.may_fire("k", 900).is_allowed());
    }

    #[test]
    fn test_call_refractory_window() {
        let (clock, _, throttle) = setup();

        assert!(throttle.check_call("all_alerts", 3600).is_allowed());
        throttle.record_call("all_alerts").unwrap();

        clock.advance_secs(1800);
        assert_eq!(
            throttle.check_call("all_alerts", 3600),
            ThrottleDecision::Suppressed(SuppressReason::Refractory)
        );
        // The global window blocks other channel keys too.
        assert!(!throttle.check_call("other", 3600).is_allowed());

        clock.advance_secs(1800);
        assert!(throttle.tick().unwrap().refractory_cleared);
        assert!(throttle.check_call("all_alerts", 3600).is_allowed());
    }

    #[test]
    fn test_check_call_without_record_leaves_window_closed() {
        let (_, _, throttle) = setup();
        assert!(throttle.check_call("all_alerts", 3600).is_allowed());
        assert!(throttle.check_call("all_alerts", 3600).is_allowed());
        assert_eq!(throttle.timers().call_refractory_start, None);
    }

    #[test]
    fn test_may_call_records_on_allow() {
        let (_, _, throttle) = setup();
        assert!(throttle.may_call("all_alerts", 3600).is_allowed());
        assert!(!throttle.may_call("all_alerts", 3600).is_allowed());
        assert_eq!(throttle.timers().call_refractory_start, Some(BASE_TIME));
    }

    #[test]
    fn test_tick_is_idempotent_and_quiet_when_nothing_changes() {
        let (clock, store, throttle) = setup();
        throttle.record_call("all_alerts").unwrap();
        let saves = store.saved.lock().len();

        assert!(!throttle.tick().unwrap().changed());
        assert_eq!(store.saved.lock().len(), saves);

        clock.advance_secs(3600);
        assert!(throttle.tick().unwrap().refractory_cleared);
        assert!(!throttle.tick().unwrap().changed());
        assert_eq!(store.saved.lock().len(), saves + 1);
    }

    #[test]
    fn test_restore_honours_persisted_refractory() {
        let (clock, _, throttle) = setup();
        throttle.restore(ThrottleTimers {
            call_refractory_start: Some(BASE_TIME - 600_000),
            ..ThrottleTimers::default()
        });

        assert!(!throttle.check_call("all_alerts", 3600).is_allowed());
        clock.advance_secs(3000);
        assert!(throttle.check_call("all_alerts", 3600).is_allowed());
    }

    #[test]
    fn test_snooze_length_is_persisted_and_restored() {
        let (clock, store, throttle) = setup();
        throttle.start_snooze(3600).unwrap();
        let saved = *store.saved.lock().last().unwrap();
        assert_eq!(saved.snooze_duration_secs, Some(3600));

        let restarted = NotificationThrottle::new(
            clock.clone(),
            Arc::new(NoopTimerStore),
            ThrottleSettings::default(),
        );
        restarted.restore(saved);
        clock.advance_secs(400);
        assert!(restarted.is_snoozed());
        assert!(!restarted.tick().unwrap().snooze_cleared);

        clock.advance_secs(3200);
        assert!(restarted.tick().unwrap().snooze_cleared);
        assert_eq!(restarted.timers(), ThrottleTimers::default());
    }

    #[test]
    fn test_restore_snooze_without_length_uses_default() {
        let (clock, _, throttle) = setup();
        throttle.restore(ThrottleTimers {
            snooze_start: Some(BASE_TIME),
            ..ThrottleTimers::default()
        });
        assert_eq!(throttle.timers().snooze_duration_secs, Some(300));

        clock.advance_secs(300);
        assert!(!throttle.is_snoozed());
    }

    #[test]
    fn test_begin_cycle_resets_counter() {
        let (_, _, throttle) = setup();
        throttle.may_fire("k", 900);
        throttle.may_fire("k", 900);
        throttle.may_fire("k", 900);
        assert_eq!(throttle.begin_cycle(), 2);
        assert_eq!(throttle.suppressed_count(), 0);
    }

    #[test]
    fn test_persistence_failure_keeps_memory_state() {
        let clock = ManualClock::shared(BASE_TIME);
        let store = Arc::new(RecordingTimerStore {
            fail: true,
            ..Default::default()
        });
        let throttle = NotificationThrottle::new(clock, store, ThrottleSettings::default());

        assert!(throttle.start_snooze(300).is_err());
        assert!(throttle.is_snoozed());
    }
}
