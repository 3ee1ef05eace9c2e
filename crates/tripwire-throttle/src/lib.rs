//! Notification throttling for tripwire.
//!
//! `NotificationThrottle` owns the only state that outlives a cycle: per-key
//! cooldown stamps, the global call refractory window and the operator
//! snooze. Time comes from an injected `Clock`; the two window timers are
//! persisted through a `TimerStore` so a restart honours them.

pub mod error;
pub mod state;
pub mod throttle;

pub use error::{ThrottleError, ThrottleResult};
pub use state::{ThrottleState, ThrottleTimers};
pub use throttle::{
    NoopTimerStore, NotificationThrottle, SuppressReason, ThrottleDecision, ThrottleSettings,
    TickOutcome, TimerStore,
};
