//! Notification channel implementations.

pub mod telegram;

use async_trait::async_trait;

use crate::error::ChannelError;

/// Trait for notification channels (Telegram, etc.).
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Deliver a plain-text message to the given recipient.
    async fn send(&self, chat_id: &str, text: &str) -> Result<(), ChannelError>;
}
