//! Throttle state.

use std::collections::HashMap;

/// Timers that survive a restart. Unix milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThrottleTimers {
    pub call_refractory_start: Option<u64>,
    pub snooze_start: Option<u64>,
    /// Length of the active snooze in seconds; `None` when not snoozed.
    pub snooze_duration_secs: Option<u64>,
}

/// Everything the throttle remembers between decisions.
///
/// Timestamps are Unix milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThrottleState {
    /// Last admitted message per alert-and-level key.
    pub last_triggered: HashMap<String, u64>,
    /// Last successful dispatch per channel key.
    pub last_call_triggered: HashMap<String, u64>,
    pub call_refractory_start: Option<u64>,
    pub snooze_start: Option<u64>,
    /// Length of the active snooze.
    pub snooze_duration_secs: u64,
    /// Decisions suppressed since the cycle began.
    pub suppressed_count: u32,
}

impl ThrottleState {
    pub fn timers(&self) -> ThrottleTimers {
        ThrottleTimers {
            call_refractory_start: self.call_refractory_start,
            snooze_start: self.snooze_start,
            snooze_duration_secs: self.snooze_start.map(|_| self.snooze_duration_secs),
        }
    }

    /// Whether a snooze is active at `now_ms`.
    pub fn is_snoozed(&self, now_ms: u64) -> bool {
        self.snooze_start
            .is_some_and(|start| !window_elapsed(start, now_ms, self.snooze_duration_secs))
    }
}

/// Whether at least `window_secs` have passed since `start_ms`.
///
/// A clock that moved backwards counts as no time elapsed.
pub(crate) fn window_elapsed(start_ms: u64, now_ms: u64, window_secs: u64) -> bool {
    now_ms.saturating_sub(start_ms) >= window_secs.saturating_mul(1000)
}
