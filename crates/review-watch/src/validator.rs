//! Shape checks for review API payloads.

use serde_json::Value;
use tracing::debug;

use crate::error::WatchError;

/// Key holding the homework list.
const HOMEWORKS_KEY: &str = "homeworks";

/// Key holding the server-side cursor for the next request.
const CURRENT_DATE_KEY: &str = "current_date";

/// Extract the homework list from a decoded payload.
///
/// Records are returned verbatim; their contents are checked later by the
/// status mapper.
pub fn validate(payload: &Value) -> Result<Vec<Value>, WatchError> {
    let Some(object) = payload.as_object() else {
        return Err(WatchError::Shape(format!(
            "expected a JSON object, got {}",
            kind(payload)
        )));
    };

    let Some(homeworks) = object.get(HOMEWORKS_KEY) else {
        return Err(WatchError::Shape(format!(
            "response has no `{HOMEWORKS_KEY}` key"
        )));
    };

    match homeworks {
        Value::Array(records) => Ok(records.clone()),
        other => Err(WatchError::Shape(format!(
            "`{HOMEWORKS_KEY}` is {}, expected an array",
            kind(other)
        ))),
    }
}

/// Cursor for the next poll: the server's `current_date`, or `previous`
/// when the server omits it. Fractional timestamps are truncated.
pub fn next_cursor(payload: &Value, previous: i64) -> i64 {
    let Some(value) = payload.get(CURRENT_DATE_KEY) else {
        return previous;
    };

    match value.as_i64() {
        Some(cursor) => cursor,
        None => match value.as_f64() {
            Some(seconds) if seconds.is_finite() => seconds.trunc() as i64,
            _ => {
                debug!(current_date = %value, "Ignoring non-numeric cursor");
                previous
            }
        },
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
