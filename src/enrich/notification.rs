//! The assembled notification, independent of any webhook wire format.

use chrono::{DateTime, Utc};

/// A labelled value shown alongside the body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationField {
    pub name: String,
    pub value: String,
}

impl NotificationField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        NotificationField {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One announcement, built fresh for every dispatch attempt and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// The entity's display name.
    pub title: String,

    /// Cleaned, truncated change description.
    pub body_text: String,

    /// Where the title and the action button point.
    pub link_url: String,

    /// Header image, when the metadata lookup found one.
    pub image_url: Option<String>,

    /// Structured fields in display order.
    pub fields: Vec<NotificationField>,

    /// When the change was detected (used for the footer and timestamp).
    pub detected_at: DateTime<Utc>,
}
