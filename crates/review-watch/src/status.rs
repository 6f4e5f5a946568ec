//! Review statuses and their chat-facing texts.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WatchError;

/// Review status codes the API is known to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Accepted by the reviewer.
    Approved,
    /// Picked up for review.
    Reviewing,
    /// Returned with remarks.
    Rejected,
}

impl ReviewStatus {
    /// Wire code used by the review API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Reviewing => "reviewing",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = WatchError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        match code {
            "approved" => Ok(Self::Approved),
            "reviewing" => Ok(Self::Reviewing),
            "rejected" => Ok(Self::Rejected),
            other => Err(WatchError::UnknownStatus(other.to_string())),
        }
    }
}

/// A homework record rendered into a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub homework_name: String,
    pub status: ReviewStatus,
    pub message: String,
}

/// Fixed mapping from review status to display text.
#[derive(Debug, Clone)]
pub struct StatusCatalog {
    verdicts: HashMap<ReviewStatus, String>,
}

impl StatusCatalog {
    /// Build a catalog from explicit entries.
    ///
    /// Statuses left out are treated as unknown by [`StatusCatalog::render`].
    #[must_use]
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ReviewStatus, S)>,
        S: Into<String>,
    {
        Self {
            verdicts: entries.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }

    /// Display text for a status, if the catalog knows it.
    #[must_use]
    pub fn verdict(&self, status: ReviewStatus) -> Option<&str> {
        self.verdicts.get(&status).map(String::as_str)
    }

    /// Turn a raw homework record into the message announcing its status.
    pub fn render(&self, record: &Value) -> Result<StatusUpdate, WatchError> {
        let homework_name = string_field(record, "homework_name")?;
        let code = string_field(record, "status")?;

        let status: ReviewStatus = code.parse()?;
        let verdict = self
            .verdict(status)
            .ok_or_else(|| WatchError::UnknownStatus(code.to_string()))?;

        Ok(StatusUpdate {
            homework_name: homework_name.to_string(),
            status,
            message: format!("Изменился статус проверки работы \"{homework_name}\". {verdict}"),
        })
    }
}

impl Default for StatusCatalog {
    fn default() -> Self {
        Self::new([
            (
                ReviewStatus::Approved,
                "Работа проверена: ревьюеру всё понравилось. Ура!",
            ),
            (ReviewStatus::Reviewing, "Работа взята на проверку ревьюером."),
            (
                ReviewStatus::Rejected,
                "Работа проверена: у ревьюера есть замечания.",
            ),
        ])
    }
}

fn string_field<'a>(record: &'a Value, key: &str) -> Result<&'a str, WatchError> {
    record
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| WatchError::Shape(format!("homework record has no string `{key}`")))
}
