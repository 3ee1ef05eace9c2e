//! Notification channel contract.

use std::fmt;

use async_trait::async_trait;

use crate::error::NotifyResult;

/// Kind of channel, used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Log,
    Webhook,
    VoiceFlow,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Webhook => "webhook",
            Self::VoiceFlow => "voice_flow",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outbound notification transport.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Deliver `message`. Returns the provider's dispatch id.
    async fn send(&self, message: &str) -> NotifyResult<String>;
}
