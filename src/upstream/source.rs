//! The upstream seam the loops are written against.
//!
//! The scan loop and the enricher only ever talk to [`UpstreamSource`], so
//! tests can substitute a scripted fake for the real Steam client.

use std::future::Future;

use super::error::UpstreamError;
use crate::types::{AppId, ChangeRecord};

/// How much of an app's news feed to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedWindow {
    /// Number of most recent items to return.
    pub count: u32,

    /// Per-item cap on `contents` length, applied server-side.
    pub max_length: u32,
}

impl FeedWindow {
    /// The window the scan loop uses: just the newest item, lightly truncated.
    pub const LATEST: Self = Self {
        count: 1,
        max_length: 500,
    };

    /// A window of the `count` newest items with long bodies, for text scanning.
    pub const fn recent(count: u32) -> Self {
        Self {
            count,
            max_length: 5000,
        }
    }
}

/// A source of per-app change records and display metadata.
pub trait UpstreamSource: Send + Sync {
    /// Fetches the newest change records for `app_id`, newest first.
    ///
    /// An app with no news yields an empty vector, not an error.
    fn recent_changes(
        &self,
        app_id: AppId,
        window: FeedWindow,
    ) -> impl Future<Output = Result<Vec<ChangeRecord>, UpstreamError>> + Send;

    /// Fetches the display image URL for `app_id`, if it has one.
    fn display_image(
        &self,
        app_id: AppId,
    ) -> impl Future<Output = Result<Option<String>, UpstreamError>> + Send;
}
