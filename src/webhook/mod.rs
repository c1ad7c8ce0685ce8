//! Outbound notification delivery (Discord webhooks).

mod client;
mod error;
mod payload;

pub use client::{DiscordWebhook, NotificationSink, backpressure_cooldown};
pub use error::{DeliveryError, DeliveryErrorKind};
pub use payload::{AUTHOR_NAME, BUTTON_LABEL, EMBED_COLOR, WebhookPayload};
