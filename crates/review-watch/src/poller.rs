//! Review API client.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::WatchError;

/// Default timeout for API requests.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Authenticated client for the homework status endpoint.
#[derive(Clone)]
pub struct ReviewClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl ReviewClient {
    /// Create a client for `endpoint` authenticating with an OAuth `token`.
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Result<Self, WatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(WatchError::Network)?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch status updates newer than `cursor` (a unix timestamp).
    ///
    /// An error payload is reported as [`WatchError::Server`] even when it
    /// arrives with a non-200 status.
    pub async fn fetch(&self, cursor: i64) -> Result<Value, WatchError> {
        debug!(endpoint = %self.endpoint, cursor, "Requesting homework statuses");

        let response = self
            .client
            .get(&self.endpoint)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .query(&[("from_date", cursor)])
            .send()
            .await
            .map_err(WatchError::Network)?;

        let status = response.status();
        let body = response.text().await.map_err(WatchError::Network)?;
        let payload: Option<Value> = serde_json::from_str(&body).ok();

        if let Some(reason) = payload.as_ref().and_then(server_error) {
            return Err(WatchError::Server(reason));
        }

        if status != StatusCode::OK {
            return Err(WatchError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        payload.ok_or_else(|| WatchError::Shape("response body is not valid JSON".to_string()))
    }
}

/// Describe the error carried by a payload, if it carries one.
fn server_error(payload: &Value) -> Option<String> {
    let object = payload.as_object()?;
    let code = object.get("code").map(describe);
    let detail = object
        .get("error")
        .or_else(|| object.get("message"))
        .map(describe);

    match (code, detail) {
        (Some(code), Some(detail)) => Some(format!("{code} ({detail})")),
        (Some(code), None) => Some(code),
        (None, Some(detail)) if object.contains_key("error") => Some(detail),
        _ => None,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
