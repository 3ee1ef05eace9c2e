//! Channel configuration.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::channel::NotificationChannel;
use crate::error::NotifyResult;
use crate::log::LogChannel;
use crate::voice::{VoiceFlowChannel, VoiceFlowConfig};
use crate::webhook::WebhookChannel;

fn default_timeout_secs() -> u64 {
    30
}

/// Which channel delivers notifications, tagged by `kind`.
///
/// ```toml
/// [notification]
/// kind = "webhook"
/// url = "https://hooks.example.com/alerts"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelConfig {
    #[default]
    Log,
    Webhook {
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    VoiceFlow {
        #[serde(flatten)]
        flow: VoiceFlowConfig,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

/// Build the configured channel.
pub fn build_channel(config: &ChannelConfig) -> NotifyResult<Arc<dyn NotificationChannel>> {
    let channel: Arc<dyn NotificationChannel> = match config {
        ChannelConfig::Log => Arc::new(LogChannel),
        ChannelConfig::Webhook { url, timeout_secs } => Arc::new(WebhookChannel::new(
            url.clone(),
            Duration::from_secs(*timeout_secs),
        )?),
        ChannelConfig::VoiceFlow { flow, timeout_secs } => Arc::new(VoiceFlowChannel::new(
            flow.clone(),
            Duration::from_secs(*timeout_secs),
        )?),
    };
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelKind;

    #[test]
    fn test_parse_webhook_config() {
        let cfg: ChannelConfig = toml::from_str(
            r#"
            kind = "webhook"
            url = "https://hooks.example.com/a"
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg,
            ChannelConfig::Webhook {
                url: "https://hooks.example.com/a".to_string(),
                timeout_secs: 30,
            }
        );
        assert_eq!(build_channel(&cfg).unwrap().kind(), ChannelKind::Webhook);
    }

    #[test]
    fn test_parse_voice_flow_config() {
        let cfg: ChannelConfig = toml::from_str(
            r#"
            kind = "voice_flow"
            account_sid = "AC1"
            auth_token = "tok"
            flow_sid = "FW1"
            to_phone = "+1555"
            from_phone = "+1666"
            timeout_secs = 10
            "#,
        )
        .unwrap();
        let ChannelConfig::VoiceFlow { flow, timeout_secs } = &cfg else {
            panic!("expected voice flow config");
        };
        assert_eq!(flow.base_url, crate::voice::DEFAULT_BASE_URL);
        assert_eq!(*timeout_secs, 10);
        assert_eq!(build_channel(&cfg).unwrap().kind(), ChannelKind::VoiceFlow);
    }

    #[test]
    fn test_default_is_log() {
        assert_eq!(ChannelConfig::default(), ChannelConfig::Log);
        assert_eq!(
            build_channel(&ChannelConfig::Log).unwrap().kind(),
            ChannelKind::Log
        );
    }
}
