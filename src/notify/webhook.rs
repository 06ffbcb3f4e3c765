//! Chat webhook delivery

use crate::config::NotificationConfig;
use crate::notify::{render_batches, MatchNotice, NotifyError, NotifyResult, Notifier};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Posts `{"text": ...}` messages to an incoming-webhook URL
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    batch_size: usize,
    batch_delay: Duration,
}

impl WebhookNotifier {
    pub fn new(client: Client, config: &NotificationConfig) -> Self {
        Self {
            client,
            batch_size: config.batch_size,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }

    /// Overrides the pause between messages
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        webhook_url: &str,
        matches: &[MatchNotice],
        site_label: &str,
    ) -> NotifyResult<()> {
        if webhook_url.is_empty() || matches.is_empty() {
            return Ok(());
        }

        let messages = render_batches(matches, self.batch_size, site_label);
        let total = messages.len();
        info!(
            site = %site_label,
            matches = matches.len(),
            batches = total,
            "Sending webhook notification"
        );

        for (index, text) in messages.into_iter().enumerate() {
            if index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            let response = self
                .client
                .post(webhook_url)
                .json(&json!({ "text": text }))
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(NotifyError::Status { status, body });
            }
            debug!(batch = index + 1, total, "Webhook batch delivered");
        }

        Ok(())
    }
}
