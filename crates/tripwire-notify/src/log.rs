//! Channel that only logs.

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::channel::{ChannelKind, NotificationChannel};
use crate::error::NotifyResult;

/// Writes the message to the log at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Log
    }

    async fn send(&self, message: &str) -> NotifyResult<String> {
        let dispatch_id = Uuid::new_v4().to_string();
        warn!(%dispatch_id, lines = message.lines().count(), "ALERT NOTIFICATION\n{message}");
        Ok(dispatch_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_channel_returns_unique_ids() {
        let channel = LogChannel;
        let a = channel.send("one").await.unwrap();
        let b = channel.send("two").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(channel.kind(), ChannelKind::Log);
    }
}
