//! HTTP relay dispatcher: posts the formatted alert to a mail/IM relay
//! endpoint supplied via the environment.

use crate::core::monitor::Breach;
use crate::core::record::PositionRecord;
use crate::notify::{AlertNotifier, format_alert};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebhookNotifier {
    url: Option<String>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>) -> Result<Self> {
        Ok(WebhookNotifier {
            url,
            client: reqwest::Client::builder()
                .user_agent("navsync/1.0")
                .build()?,
        })
    }
}

#[async_trait]
impl AlertNotifier for WebhookNotifier {
    async fn notify(&self, breach: Breach, record: &PositionRecord, price: f64) -> Result<()> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| anyhow!("ALERT_WEBHOOK_URL not set; alert not dispatched"))?;

        let message = format_alert(breach, record, price);
        debug!(subject = %message.subject, "dispatching alert");

        self.client
            .post(url)
            .json(&json!({ "subject": message.subject, "body": message.body }))
            .timeout(DISPATCH_TIMEOUT)
            .send()
            .await
            .context("alert dispatch request failed")?
            .error_for_status()
            .context("alert relay returned an error status")?;
        Ok(())
    }
}
