//! Voice call channel backed by a hosted call-flow execution API.
//!
//! The provider exposes `POST {base_url}/v2/Flows/{flow_sid}/Executions`
//! with form fields `To`, `From` and a JSON `Parameters` blob. The flow
//! reads `custom_message` and speaks it.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use tripwire_core::{retry_with_backoff, RetryPolicy};

use crate::channel::{ChannelKind, NotificationChannel};
use crate::error::{NotifyError, NotifyResult};

pub const DEFAULT_BASE_URL: &str = "https://studio.twilio.com";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Credentials and endpoints for the voice flow.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct VoiceFlowConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub flow_sid: String,
    pub to_phone: String,
    pub from_phone: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl fmt::Debug for VoiceFlowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceFlowConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"***")
            .field("flow_sid", &self.flow_sid)
            .field("to_phone", &self.to_phone)
            .field("from_phone", &self.from_phone)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl VoiceFlowConfig {
    pub fn validate(&self) -> NotifyResult<()> {
        let fields = [
            ("account_sid", &self.account_sid),
            ("auth_token", &self.auth_token),
            ("flow_sid", &self.flow_sid),
            ("to_phone", &self.to_phone),
            ("from_phone", &self.from_phone),
            ("base_url", &self.base_url),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(NotifyError::Config(format!("voice flow {name} is missing")));
            }
        }
        Ok(())
    }

    fn executions_url(&self) -> String {
        format!(
            "{}/v2/Flows/{}/Executions",
            self.base_url.trim_end_matches('/'),
            self.flow_sid
        )
    }
}

#[derive(Debug, Deserialize)]
struct ExecutionResponse {
    sid: String,
}

/// Places a phone call that reads the alert message.
#[derive(Debug, Clone)]
pub struct VoiceFlowChannel {
    client: Client,
    config: VoiceFlowConfig,
    retry: RetryPolicy,
}

impl VoiceFlowChannel {
    /// A failed call is not retried by default; a duplicate call is worse
    /// than a missed one within the same cycle.
    pub fn new(config: VoiceFlowConfig, timeout: Duration) -> NotifyResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            retry: RetryPolicy::none(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn execute_once(&self, parameters: &str) -> NotifyResult<String> {
        let url = self.config.executions_url();
        debug!(%url, to = %self.config.to_phone, "Starting voice flow execution");

        let form = [
            ("To", self.config.to_phone.as_str()),
            ("From", self.config.from_phone.as_str()),
            ("Parameters", parameters),
        ];

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let execution: ExecutionResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::HttpClient(format!("Failed to parse execution: {e}")))?;
        Ok(execution.sid)
    }
}

#[async_trait]
impl NotificationChannel for VoiceFlowChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::VoiceFlow
    }

    async fn send(&self, message: &str) -> NotifyResult<String> {
        let parameters = serde_json::json!({ "custom_message": message }).to_string();
        let parameters = parameters.as_str();

        let sid = retry_with_backoff(self.retry, "voice_flow_execute", || {
            self.execute_once(parameters)
        })
        .await?;

        info!(execution_sid = %sid, "Voice flow execution started");
        Ok(sid)
    }
}
