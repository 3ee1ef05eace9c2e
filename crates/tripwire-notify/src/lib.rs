//! Notification channels for tripwire.
//!
//! Every channel implements `NotificationChannel`: one combined message in,
//! one dispatch id out. Transport failures come back as `NotifyError`, which
//! reports whether a retry could help.

pub mod channel;
pub mod config;
pub mod error;
pub mod log;
pub mod voice;
pub mod webhook;

pub use channel::{ChannelKind, NotificationChannel};
pub use config::{build_channel, ChannelConfig};
pub use error::{NotifyError, NotifyResult};
pub use log::LogChannel;
pub use voice::{VoiceFlowChannel, VoiceFlowConfig};
pub use webhook::WebhookChannel;
