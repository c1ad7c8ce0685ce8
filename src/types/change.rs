//! Upstream change records.

use serde::{Deserialize, Serialize};

use super::ids::{AppId, ChangeToken};

/// One item of an app's news feed, as returned by `GetNewsForApp`.
///
/// Only the fields the watcher needs are kept; everything else in the feed
/// item is ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// The news item's `gid`, used as the change token.
    #[serde(rename = "gid")]
    pub token: ChangeToken,

    #[serde(default)]
    pub title: String,

    /// Body text. Steam serves this with HTML and BBCode markup mixed in.
    #[serde(rename = "contents", default)]
    pub body_text: String,

    #[serde(default)]
    pub url: String,

    /// Publication time as a unix timestamp (seconds).
    #[serde(rename = "date", default)]
    pub timestamp: i64,
}

impl ChangeRecord {
    /// Returns the text to scan and display: the body, or the title when the
    /// body is empty.
    pub fn text(&self) -> &str {
        if self.body_text.trim().is_empty() {
            &self.title
        } else {
            &self.body_text
        }
    }

    /// Returns the link for this record, falling back to the app's news page.
    pub fn link(&self, app_id: AppId) -> String {
        if self.url.trim().is_empty() {
            format!("https://store.steampowered.com/news/app/{}", app_id)
        } else {
            self.url.clone()
        }
    }
}
