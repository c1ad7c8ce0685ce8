//! Webhook delivery error types.
//!
//! The dispatch loop only needs one distinction:
//!
//! - **Backpressure** (HTTP 429): put the item back at the front of the queue
//!   and pause dispatch for the signalled cooldown.
//! - **Failed** (everything else): log and drop the item.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// The kind of delivery error, categorized for the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryErrorKind {
    /// The webhook asked us to slow down.
    Backpressure {
        /// How long the webhook asked us to wait, if it said.
        retry_after: Option<Duration>,
    },

    /// Any other failure. The item will not be retried.
    Failed,
}

/// A webhook delivery error.
#[derive(Debug, Error)]
pub struct DeliveryError {
    pub kind: DeliveryErrorKind,

    /// The HTTP status code, if a response was received.
    pub status_code: Option<u16>,

    pub message: String,

    /// The underlying transport error, if any.
    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "webhook error (HTTP {}): {}", code, self.message),
            None => write!(f, "webhook error: {}", self.message),
        }
    }
}

impl DeliveryError {
    /// Creates a backpressure error as if the webhook had answered HTTP 429.
    pub fn backpressure(retry_after: Option<Duration>) -> Self {
        Self {
            kind: DeliveryErrorKind::Backpressure { retry_after },
            status_code: Some(429),
            message: "rate limited".to_string(),
            source: None,
        }
    }

    /// Creates a non-retriable failure without a transport source.
    pub fn failed_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: DeliveryErrorKind::Failed,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Categorizes a non-success HTTP response.
    ///
    /// For 429, the cooldown comes from the `Retry-After` header when present,
    /// otherwise from the `retry_after` field Discord puts in the JSON body.
    pub fn from_status(status: u16, retry_after_header: Option<&str>, body: &str) -> Self {
        if status == 429 {
            let retry_after = retry_after_header
                .and_then(parse_retry_after_header)
                .or_else(|| parse_retry_after_body(body));
            return Self {
                kind: DeliveryErrorKind::Backpressure { retry_after },
                status_code: Some(status),
                message: "rate limited".to_string(),
                source: None,
            };
        }

        let message = if body.trim().is_empty() {
            "empty response body".to_string()
        } else {
            body.trim().chars().take(200).collect()
        };
        Self {
            kind: DeliveryErrorKind::Failed,
            status_code: Some(status),
            message,
            source: None,
        }
    }

    /// Categorizes a transport error. These are never backpressure.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        Self {
            kind: DeliveryErrorKind::Failed,
            status_code: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Returns the requested cooldown if this is a backpressure signal.
    pub fn backpressure_hint(&self) -> Option<Option<Duration>> {
        match self.kind {
            DeliveryErrorKind::Backpressure { retry_after } => Some(retry_after),
            DeliveryErrorKind::Failed => None,
        }
    }
}

/// Parses a `Retry-After` header given in (possibly fractional) seconds.
fn parse_retry_after_header(value: &str) -> Option<Duration> {
    seconds_to_duration(value.trim().parse::<f64>().ok()?)
}

/// Parses Discord's `{"retry_after": 1.5, ...}` rate-limit body.
fn parse_retry_after_body(body: &str) -> Option<Duration> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    seconds_to_duration(value.get("retry_after")?.as_f64()?)
}

/// Longest cooldown a webhook response can impose.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60 * 60);

/// Negative, NaN and unrepresentable values are ignored; anything past
/// [`MAX_RETRY_AFTER`] is clamped to it.
fn seconds_to_duration(secs: f64) -> Option<Duration> {
    if secs.is_nan() || secs < 0.0 {
        return None;
    }
    let duration = Duration::try_from_secs_f64(secs).unwrap_or(MAX_RETRY_AFTER);
    Some(duration.min(MAX_RETRY_AFTER))
}
