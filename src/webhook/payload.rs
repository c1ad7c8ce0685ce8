//! Discord webhook message body.
//!
//! Only the subset of the execute-webhook schema we actually send is modelled.

use serde::Serialize;

use crate::enrich::Notification;

/// Embed accent colour.
pub const EMBED_COLOR: u32 = 0x8B7EE8;

/// Line shown above the embed title.
pub const AUTHOR_NAME: &str = "Game Update Detected";

/// Label of the link button under the embed.
pub const BUTTON_LABEL: &str = "View Patch";

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_BUTTON: u8 = 2;
const BUTTON_STYLE_LINK: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
    pub components: Vec<ActionRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub author: EmbedAuthor,
    pub color: u32,
    pub title: String,
    pub url: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    pub footer: EmbedFooter,
    /// ISO-8601 timestamp rendered by the client in the reader's locale.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<Button>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    pub kind: u8,
    pub style: u8,
    pub label: String,
    pub url: String,
}

impl From<&Notification> for WebhookPayload {
    fn from(n: &Notification) -> Self {
        let embed = Embed {
            author: EmbedAuthor {
                name: AUTHOR_NAME.to_string(),
            },
            color: EMBED_COLOR,
            title: n.title.clone(),
            url: n.link_url.clone(),
            description: n.body_text.clone(),
            fields: n
                .fields
                .iter()
                .map(|f| EmbedField {
                    name: f.name.clone(),
                    value: f.value.clone(),
                    inline: false,
                })
                .collect(),
            image: n.image_url.as_ref().map(|url| EmbedImage { url: url.clone() }),
            footer: EmbedFooter {
                text: format!(
                    "Detected at {}",
                    n.detected_at.format("%Y-%m-%d %H:%M:%S UTC")
                ),
            },
            timestamp: n.detected_at.to_rfc3339(),
        };

        let button = Button {
            kind: COMPONENT_BUTTON,
            style: BUTTON_STYLE_LINK,
            label: BUTTON_LABEL.to_string(),
            url: n.link_url.clone(),
        };

        WebhookPayload {
            embeds: vec![embed],
            components: vec![ActionRow {
                kind: COMPONENT_ACTION_ROW,
                components: vec![button],
            }],
        }
    }
}
