//! Upstream (Steam Web API) error types.
//!
//! Errors are categorized for the scan loop's retry decisions:
//!
//! - **Transient** errors are retried a small fixed number of times (5xx,
//!   timeouts, connection failures, truncated or undecodable bodies).
//! - **RateLimited** errors are a global backpressure signal. They are never
//!   retried in place; the whole scan pauses for a cooldown instead.
//! - **Permanent** errors skip the entity for this pass (most 4xx).

use std::fmt;
use thiserror::Error;

/// The kind of upstream error, categorized for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    /// Safe to retry after a short delay.
    Transient,

    /// The upstream asked us to slow down (HTTP 429, or a 403 whose body says
    /// so). Pause everything, not just this request.
    RateLimited,

    /// Retrying will not help (unknown app, bad request, auth failure).
    Permanent,
}

impl UpstreamErrorKind {
    /// Returns true if the same request may be retried after a short delay.
    ///
    /// `RateLimited` returns false: it needs a global cooldown, not a retry.
    pub fn is_retriable(&self) -> bool {
        matches!(self, UpstreamErrorKind::Transient)
    }
}

/// An upstream API error with categorization for retry decisions.
#[derive(Debug, Error)]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,

    /// The HTTP status code, if a response was received.
    pub status_code: Option<u16>,

    pub message: String,

    /// The underlying transport error, if any.
    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "upstream error (HTTP {}): {}", code, self.message),
            None => write!(f, "upstream error: {}", self.message),
        }
    }
}

impl UpstreamError {
    /// Creates a transient error without a transport source.
    pub fn transient_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a permanent error without a transport source.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a rate-limit error as if the upstream had answered HTTP 429.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: UpstreamErrorKind::RateLimited,
            status_code: Some(429),
            message: message.into(),
            source: None,
        }
    }

    /// Categorizes a non-success HTTP response.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            429 => UpstreamErrorKind::RateLimited,
            403 if is_rate_limit_message(body) => UpstreamErrorKind::RateLimited,
            code if (500..600).contains(&code) => UpstreamErrorKind::Transient,
            408 => UpstreamErrorKind::Transient,
            _ => UpstreamErrorKind::Permanent,
        };
        Self {
            kind,
            status_code: Some(status),
            message: summarize_body(body),
            source: None,
        }
    }

    /// Categorizes a reqwest error.
    ///
    /// Anything that failed before a status line arrived (timeouts, DNS,
    /// refused connections) or while reading the body is transient. Errors
    /// that carry a status are categorized by that status.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        let message = err.to_string();

        if let Some(status) = err.status() {
            let mut categorized = Self::from_status(status.as_u16(), &message);
            categorized.source = Some(err);
            return categorized;
        }

        let kind = if err.is_timeout()
            || err.is_connect()
            || err.is_request()
            || err.is_body()
            || err.is_decode()
        {
            UpstreamErrorKind::Transient
        } else {
            UpstreamErrorKind::Permanent
        };

        Self {
            kind,
            status_code: None,
            message,
            source: Some(err),
        }
    }

    /// Returns true if this error is an upstream rate-limit signal.
    pub fn is_rate_limited(&self) -> bool {
        self.kind == UpstreamErrorKind::RateLimited
    }
}

/// Checks if a response body indicates throttling.
fn is_rate_limit_message(body: &str) -> bool {
    let body_lower = body.to_lowercase();
    body_lower.contains("rate limit")
        || body_lower.contains("too many requests")
        || body_lower.contains("throttl")
}

/// Trims a response body to something fit for a log line.
fn summarize_body(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
