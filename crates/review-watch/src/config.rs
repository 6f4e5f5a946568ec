//! Process configuration read from the environment.

use std::fmt;
use std::time::Duration;

use crate::error::WatchError;

/// Homework status endpoint of the review API.
pub const DEFAULT_ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";

/// Pause between two poll cycles.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(600);

/// Required variables paired with the names older deployments used.
const PRACTICUM_TOKEN: (&str, &str) = ("PRACTICUM_TOKEN", "TOKEN_OF_PRACTICUM");
const TELEGRAM_TOKEN: (&str, &str) = ("TELEGRAM_TOKEN", "TOKEN_OF_TELEGRAM");
const TELEGRAM_CHAT_ID: (&str, &str) = ("TELEGRAM_CHAT_ID", "ID_OF_CHAT");

const ENV_PRACTICUM_ENDPOINT: &str = "PRACTICUM_ENDPOINT";
const ENV_TELEGRAM_API_URL: &str = "TELEGRAM_API_URL";

#[derive(Clone)]
pub struct Config {
    /// OAuth token for the review API.
    pub practicum_token: String,
    /// Telegram bot token.
    pub telegram_token: String,
    /// Recipient chat.
    pub telegram_chat_id: String,
    /// Review API endpoint. Defaults to [`DEFAULT_ENDPOINT`].
    pub endpoint: String,
    /// Telegram Bot API base URL.
    pub telegram_api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, WatchError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Every missing required variable is named in the returned error,
    /// not just the first one.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let practicum_token = required(&lookup, PRACTICUM_TOKEN);
        let telegram_token = required(&lookup, TELEGRAM_TOKEN);
        let telegram_chat_id = required(&lookup, TELEGRAM_CHAT_ID);

        let (Some(practicum_token), Some(telegram_token), Some(telegram_chat_id)) =
            (&practicum_token, &telegram_token, &telegram_chat_id)
        else {
            let missing: Vec<&str> = [
                (PRACTICUM_TOKEN.0, practicum_token.is_none()),
                (TELEGRAM_TOKEN.0, telegram_token.is_none()),
                (TELEGRAM_CHAT_ID.0, telegram_chat_id.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            return Err(WatchError::Config(missing.join(", ")));
        };

        let endpoint = optional(&lookup, ENV_PRACTICUM_ENDPOINT)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let telegram_api_url = optional(&lookup, ENV_TELEGRAM_API_URL)
            .unwrap_or_else(|| notify::channels::telegram::DEFAULT_API_BASE.to_string());

        Ok(Self {
            practicum_token: practicum_token.clone(),
            telegram_token: telegram_token.clone(),
            telegram_chat_id: telegram_chat_id.clone(),
            endpoint,
            telegram_api_url,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("practicum_token", &"<redacted>")
            .field("telegram_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("endpoint", &self.endpoint)
            .field("telegram_api_url", &self.telegram_api_url)
            .finish()
    }
}

fn optional<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.trim().is_empty())
}

fn required<F>(lookup: &F, (name, legacy): (&str, &str)) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    optional(lookup, name).or_else(|| optional(lookup, legacy))
}
