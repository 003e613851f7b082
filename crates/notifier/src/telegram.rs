//! Telegram Bot API sink

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use arb_core::{AlertConfig, DeliveryError, DeliveryResult};
use crate::sink::AlertSink;

/// Telegram credentials and endpoint
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: String,
    pub chat_id: String,
    pub timeout: Duration,
}

impl TelegramConfig {
    /// `None` unless both the bot token and the chat id are set
    pub fn from_alerts(alerts: &AlertConfig) -> Option<Self> {
        let bot_token = alerts.telegram_bot_token.clone().filter(|t| !t.is_empty())?;
        let chat_id = alerts.telegram_chat_id.clone().filter(|c| !c.is_empty())?;

        Some(Self {
            api_url: alerts.telegram_api_url.trim_end_matches('/').to_string(),
            bot_token,
            chat_id,
            timeout: Duration::from_secs(10),
        })
    }
}

/// Posts alerts with `sendMessage`
pub struct TelegramSink {
    config: TelegramConfig,
    http: Client,
}

impl TelegramSink {
    pub fn new(config: TelegramConfig) -> DeliveryResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        Ok(Self { config, http })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.config.api_url, self.config.bot_token)
    }
}

#[async_trait::async_trait]
impl AlertSink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, message: &str) -> DeliveryResult<()> {
        let payload = json!({
            "chat_id": self.config.chat_id,
            "text": message,
            "parse_mode": "Markdown",
        });

        let response = self
            .http
            .post(self.send_message_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        let body: TelegramResponse = response.json().await.unwrap_or_default();
        debug!("Telegram responded {}", status);

        check_response(status.as_u16(), &body)
    }
}

/// `sendMessage` reply envelope
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram reports failures both through the status code and the `ok` flag
fn check_response(status: u16, body: &TelegramResponse) -> DeliveryResult<()> {
    if (200..300).contains(&status) && body.ok {
        return Ok(());
    }

    let description = body.description.as_deref().unwrap_or("no description");
    Err(DeliveryError::Rejected(format!("status {}: {}", status, description)))
}
