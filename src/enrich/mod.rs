//! Turns a [`WorkItem`] into a ready-to-send [`Notification`].
//!
//! Two auxiliary lookups run concurrently for each item: the app's header
//! image and a window of its recent news (scanned for build identifiers).
//! Either lookup may fail; the notification is still produced, just without
//! the field that lookup would have supplied.

pub mod build_id;
mod notification;
pub mod text;

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::config::EnrichConfig;
use crate::types::{ChangeRecord, WorkItem};
use crate::upstream::{FeedWindow, UpstreamSource};

pub use build_id::BuildInfo;
pub use notification::{Notification, NotificationField};

/// Shown when neither the body nor the title has any text left after cleanup.
pub const DEFAULT_DESCRIPTION: &str =
    "A new version of the game has been released on the public branch.";

/// Builds notifications from work items.
#[derive(Debug)]
pub struct Enricher<S> {
    source: Arc<S>,
    config: EnrichConfig,
}

impl<S: UpstreamSource> Enricher<S> {
    pub fn new(source: Arc<S>, config: EnrichConfig) -> Self {
        Enricher { source, config }
    }

    #[instrument(skip(self, item), fields(entity = %item.entity_name, token = %item.change.token))]
    pub async fn enrich(&self, item: &WorkItem) -> Notification {
        let window = FeedWindow::recent(self.config.build_scan_window);
        let (image, history) = tokio::join!(
            self.source.display_image(item.app_id),
            self.source.recent_changes(item.app_id, window),
        );

        let image_url = image.unwrap_or_else(|e| {
            warn!(error = %e, "Image lookup failed, sending without image");
            None
        });

        let build = match history {
            Ok(records) => build_id::extract_from_records(&records),
            Err(e) => {
                warn!(error = %e, "Recent news lookup failed, sending without build id");
                BuildInfo::NoMatch
            }
        };
        debug!(?build, has_image = image_url.is_some(), "Enriched");

        Notification {
            title: item.entity_name.to_string(),
            body_text: describe(&item.change, self.config.description_limit),
            link_url: item.change.link(item.app_id),
            image_url,
            fields: build_fields(&build),
            detected_at: item.detected_at,
        }
    }
}

/// Produces the display description for a record.
///
/// Markup and build identifiers are removed from the body (or the title when
/// the body is empty after cleanup), and the result is capped at `limit`
/// characters.
pub fn describe(record: &ChangeRecord, limit: usize) -> String {
    [record.body_text.as_str(), record.title.as_str()]
        .into_iter()
        .map(clean)
        .find(|s| !s.is_empty())
        .map(|s| text::truncate(&s, limit))
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
}

fn clean(raw: &str) -> String {
    text::collapse_whitespace(&build_id::scrub(&text::strip_markup(raw)))
}

/// Maps extracted build info to display fields.
pub fn build_fields(build: &BuildInfo) -> Vec<NotificationField> {
    match build {
        BuildInfo::NoMatch => Vec::new(),
        BuildInfo::SingleBuild(id) => vec![NotificationField::new("Build ID", id.clone())],
        BuildInfo::BuildChange { old, new } => vec![NotificationField::new(
            "Build ID Change",
            format!("{old} ➡️ {new}"),
        )],
    }
}
