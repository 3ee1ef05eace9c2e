//! Alert monitor application.
//!
//! Wires the threshold document, alert registry, input sources, throttle and
//! notification channel into an `AlertManager` and runs it on a cancellable
//! polling loop.

pub mod app;
pub mod config;
pub mod error;
pub mod loader;
pub mod manager;
pub mod timers;

pub use app::Application;
pub use config::{AppConfig, SourceFile, SourcesConfig, TelemetryConfig};
pub use error::{MonitorError, MonitorResult};
pub use loader::SnapshotLoader;
pub use manager::{AlertManager, CyclePhase, CycleReport, DispatchOutcome, CALL_CHANNEL_KEY};
pub use timers::{settings_from_document, timers_from_document, DocumentTimerStore};
