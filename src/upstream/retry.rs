//! Bounded retry for upstream calls.
//!
//! Transient failures are retried a small fixed number of times with a flat
//! delay between attempts. Rate-limit signals and permanent errors come back
//! on the first occurrence: the former need a scan-wide cooldown, the latter
//! will never succeed.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::error::UpstreamError;

/// Retry budget for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Sleep before each retry.
    pub delay: Duration,
}

impl RetryConfig {
    pub const fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Total attempts, the first one included.
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryConfig {
    /// Two retries, five seconds apart.
    fn default() -> Self {
        Self::fixed(2, Duration::from_secs(5))
    }
}

/// How a retried operation ended.
#[derive(Debug)]
pub enum RetryResult<T> {
    Success(T),

    /// Every attempt failed transiently.
    ExhaustedRetries {
        last_error: UpstreamError,
        /// Attempts made, the first one included.
        attempts: u32,
    },

    /// The upstream signalled rate limiting.
    RateLimited(UpstreamError),

    /// The upstream rejected the request for good.
    PermanentError(UpstreamError),
}

/// Runs `operation` until it succeeds, fails non-transiently, or the budget
/// in `config` is spent.
pub async fn retry_with_backoff<T, F, Fut>(config: RetryConfig, mut operation: F) -> RetryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let max_attempts = config.max_attempts();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let err = match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) => e,
        };

        if err.is_rate_limited() {
            return RetryResult::RateLimited(err);
        }
        if !err.kind.is_retriable() {
            return RetryResult::PermanentError(err);
        }
        if attempts >= max_attempts {
            return RetryResult::ExhaustedRetries {
                last_error: err,
                attempts,
            };
        }
        debug!(attempts, error = %err, delay_ms = config.delay.as_millis() as u64, "Retrying");
        tokio::time::sleep(config.delay).await;
    }
}
