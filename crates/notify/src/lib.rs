//! Chat notification system for review-watch.
//!
//! This crate delivers plain-text messages to a single chat recipient
//! through one or more messaging channels. Delivery is awaited so callers
//! can log and decide what to do with a failure.
//!
//! # Usage
//!
//! ```no_run
//! use notify::Notifier;
//!
//! # async fn run() -> Result<(), notify::ChannelError> {
//! let notifier = Notifier::telegram("123456:bot-token", "987654321");
//! notifier.notify("Работа взята на проверку ревьюером.").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`NotifyChannel`] trait defines the interface for notification channels
//! - [`TelegramChannel`] implements the Telegram Bot API `sendMessage` call
//! - [`Notifier`] dispatches a message to all enabled channels

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;

pub use channels::telegram::TelegramChannel;
pub use channels::NotifyChannel;
pub use error::ChannelError;

use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Central notification dispatcher for one recipient.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    chat_id: String,
    disabled: bool,
}

impl Notifier {
    /// Create a notifier that delivers through a Telegram bot.
    #[must_use]
    pub fn telegram(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        let channel: Arc<dyn NotifyChannel> = Arc::new(TelegramChannel::new(bot_token));
        Self::with_channels(vec![channel], chat_id)
    }

    /// Create a notifier with specific channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>, chat_id: impl Into<String>) -> Self {
        let notifier = Self {
            channels,
            chat_id: chat_id.into(),
            disabled: false,
        };

        if notifier.channels.is_empty() {
            warn!("No notification channels configured");
        } else {
            info!(
                channel_count = notifier.channels.len(),
                "Notification system initialized"
            );
        }

        notifier
    }

    /// Create a disabled notifier (dry runs and tests).
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            channels: vec![],
            chat_id: String::new(),
            disabled: true,
        }
    }

    /// Whether at least one channel would attempt delivery.
    #[must_use]
    pub fn has_channels(&self) -> bool {
        !self.disabled && self.channels.iter().any(|channel| channel.enabled())
    }

    /// Send a message to every enabled channel and collect per-channel results.
    pub async fn notify_and_wait(&self, text: &str) -> Vec<(String, Result<(), ChannelError>)> {
        if self.disabled {
            info!(message = text, "Notifications disabled, skipping message");
            return vec![];
        }

        let mut results = vec![];

        for channel in &self.channels {
            let channel_name = channel.name();

            if !channel.enabled() {
                debug!(channel = channel_name, "Channel disabled, skipping");
                continue;
            }

            let result = channel.send(&self.chat_id, text).await;
            match &result {
                Ok(()) => info!(channel = channel_name, message = text, "Message sent"),
                Err(e) => error!(
                    channel = channel_name,
                    error = %e,
                    "Failed to send notification"
                ),
            }
            results.push((channel_name.to_string(), result));
        }

        results
    }

    /// Send a message, returning the first channel failure if any.
    ///
    /// Every enabled channel is attempted even when an earlier one fails.
    pub async fn notify(&self, text: &str) -> Result<(), ChannelError> {
        self.notify_and_wait(text)
            .await
            .into_iter()
            .map(|(_, result)| result)
            .find(Result::is_err)
            .unwrap_or(Ok(()))
    }
}
