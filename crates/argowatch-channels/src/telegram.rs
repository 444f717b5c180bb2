//! Telegram Bot channel — one `sendMessage` call per notification.

use argowatch_core::config::TelegramConfig;
use argowatch_core::error::{ArgoWatchError, Result};
use argowatch_core::traits::Notifier;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Sends plain-text messages to a single chat.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ArgoWatchError::Config(format!("Failed to build Telegram client: {e}")))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, message: &str) -> Result<()> {
        // No parse_mode: app names with '_' or '*' must arrive verbatim.
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": message,
        });

        // reqwest errors carry the URL, which carries the bot token.
        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                ArgoWatchError::Delivery(format!("Telegram sendMessage failed: {e}"))
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("✅ Telegram message sent to chat {}", self.chat_id);
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let description = serde_json::from_str::<TelegramApiResponse>(&text)
            .ok()
            .and_then(|r| r.description)
            .unwrap_or(text);
        Err(ArgoWatchError::Delivery(format!("Telegram API error {status}: {description}")))
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
struct TelegramApiResponse {
    description: Option<String>,
}
