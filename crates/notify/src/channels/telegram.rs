//! Telegram Bot API notification channel.
//!
//! API Documentation: <https://core.telegram.org/bots/api#sendmessage>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::NotifyChannel;

/// Base URL for the Telegram Bot API.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Timeout for a single `sendMessage` call.
const SEND_TIMEOUT_SECS: u64 = 30;

/// Telegram bot notification channel.
pub struct TelegramChannel {
    bot_token: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    /// Create a Telegram channel for the given bot token.
    ///
    /// A blank token leaves the channel disabled.
    #[must_use]
    pub fn new(bot_token: impl Into<String>) -> Self {
        let bot_token = Some(bot_token.into()).filter(|t| !t.trim().is_empty());

        if bot_token.is_none() {
            debug!("Telegram notifications disabled (empty bot token)");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            bot_token,
            api_base: DEFAULT_API_BASE.to_string(),
            client,
        }
    }

    /// Point the channel at a different Bot API server.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// The Bot API server this channel talks to.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Map a non-successful Bot API reply onto a [`ChannelError`].
    fn classify_failure(status: StatusCode, body: &str) -> ChannelError {
        let reply: Option<TelegramReply> = serde_json::from_str(body).ok();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = reply
                .as_ref()
                .and_then(|r| r.parameters.as_ref())
                .and_then(|p| p.retry_after)
                .unwrap_or(1);
            return ChannelError::RateLimited { retry_after_secs };
        }

        let description = reply
            .and_then(|r| r.description)
            .unwrap_or_else(|| body.to_string());

        ChannelError::Api {
            status: status.as_u16(),
            description,
        }
    }
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn enabled(&self) -> bool {
        self.bot_token.is_some()
    }

    async fn send(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let bot_token = self
            .bot_token
            .as_ref()
            .ok_or_else(|| ChannelError::NotConfigured("TELEGRAM_TOKEN".to_string()))?;

        // The URL embeds the bot token, so it is stripped from any reqwest error.
        let url = format!("{}/bot{bot_token}/sendMessage", self.api_base);
        let payload = SendMessage { chat_id, text };

        debug!(channel = "telegram", chat_id, len = text.len(), "Sending notification");

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChannelError::Http(e.without_url()))?;

        let accepted = status.is_success()
            && serde_json::from_str::<TelegramReply>(&body)
                .map(|r| r.ok)
                .unwrap_or(true);

        if accepted {
            debug!(channel = "telegram", "Notification sent successfully");
            return Ok(());
        }

        let error = Self::classify_failure(status, &body);
        warn!(
            channel = "telegram",
            status = %status,
            error = %error,
            "Telegram sendMessage failed"
        );
        Err(error)
    }
}

// =============================================================================
// Telegram API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TelegramReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ReplyParameters>,
}

#[derive(Debug, Deserialize)]
struct ReplyParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}
