//! Upstream (Steam Web API) access.
//!
//! Key features:
//! - A trait seam ([`UpstreamSource`]) so the loops can run against fakes
//! - Transient / rate-limited / permanent error categorization
//! - Bounded fixed-delay retry returning a typed outcome

mod client;
mod error;
mod retry;
mod source;

pub use client::{SteamClient, build_http_client};
pub use error::{UpstreamError, UpstreamErrorKind};
pub use retry::{RetryConfig, RetryResult, retry_with_backoff};
pub use source::{FeedWindow, UpstreamSource};
