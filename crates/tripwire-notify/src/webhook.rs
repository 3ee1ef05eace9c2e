//! Generic JSON webhook channel (Slack, Discord-compatible relays, etc.).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use tripwire_core::{retry_with_backoff, RetryPolicy};

use crate::channel::{ChannelKind, NotificationChannel};
use crate::error::{NotifyError, NotifyResult};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
    dispatch_id: &'a str,
    sent_at: String,
}

/// POSTs `{"text": ..., "dispatch_id": ..., "sent_at": ...}` to a URL.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    client: Client,
    url: String,
    retry: RetryPolicy,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>, timeout: Duration) -> NotifyResult<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(NotifyError::Config("webhook url is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post_once(&self, payload: &WebhookPayload<'_>) -> NotifyResult<()> {
        debug!(url = %self.url, "Posting webhook notification");

        let response = self.client.post(&self.url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(&self, message: &str) -> NotifyResult<String> {
        let dispatch_id = Uuid::new_v4().to_string();
        let payload = WebhookPayload {
            text: message,
            dispatch_id: &dispatch_id,
            sent_at: Utc::now().to_rfc3339(),
        };

        let payload = &payload;
        retry_with_backoff(self.retry, "webhook_send", || self.post_once(payload)).await?;

        info!(%dispatch_id, "Webhook notification delivered");
        Ok(dispatch_id)
    }
}
