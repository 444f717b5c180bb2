//! Generic HTTP webhook — POST `{"text": ...}` (Slack / Mattermost compatible).

use argowatch_core::config::WebhookConfig;
use argowatch_core::error::{ArgoWatchError, Result};
use argowatch_core::traits::Notifier;
use async_trait::async_trait;
use std::time::Duration;

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    headers: Vec<(String, String)>,
}

impl WebhookNotifier {
    pub fn new(config: &WebhookConfig, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ArgoWatchError::Config(format!("Failed to build webhook client: {e}")))?;
        Ok(Self {
            client,
            url: config.url.clone(),
            headers: config
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, message: &str) -> Result<()> {
        let mut req = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "text": message }));

        for (key, value) in &self.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ArgoWatchError::Delivery(format!("Webhook send failed: {e}")))?;

        if resp.status().is_success() {
            tracing::debug!("✅ Webhook notification sent to {}", self.url);
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            Err(ArgoWatchError::Delivery(format!("Webhook error {status}: {body}")))
        }
    }
}
