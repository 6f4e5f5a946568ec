//! Error types for the review watcher.

use notify::ChannelError;
use thiserror::Error;

/// Errors raised while polling, interpreting, or relaying review statuses.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The review API could not be reached.
    #[error("Failed to reach review API: {0}")]
    Network(#[source] reqwest::Error),

    /// The review API answered with an error payload.
    #[error("Review API reported an error: {0}")]
    Server(String),

    /// The review API answered with a non-200 status.
    #[error("Review API returned unexpected status {status}")]
    UnexpectedStatus { status: u16 },

    /// The response body did not have the expected shape.
    #[error("Malformed review API response: {0}")]
    Shape(String),

    /// A homework carried a status outside the catalog.
    #[error("Unknown homework status `{0}`")]
    UnknownStatus(String),

    /// The notification could not be delivered.
    #[error("Failed to deliver notification: {0}")]
    Send(#[from] ChannelError),

    /// One or more required settings are missing or blank.
    #[error("Missing required environment variables: {0}")]
    Config(String),
}

impl WatchError {
    /// Whether this failure should be relayed to the chat recipient.
    ///
    /// Delivery failures are not, since the report would go through the
    /// same broken channel.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        !matches!(self, Self::Send(_) | Self::Config(_))
    }
}
