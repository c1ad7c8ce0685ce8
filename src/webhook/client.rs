//! Discord webhook client.

use std::future::Future;
use std::time::Duration;

use tracing::trace;

use super::error::DeliveryError;
use super::payload::WebhookPayload;
use crate::enrich::Notification;

/// Where finished notifications are delivered.
///
/// The dispatch loop is written against this trait so tests can record or
/// script deliveries without a network.
pub trait NotificationSink: Send + Sync {
    fn deliver(
        &self,
        notification: &Notification,
    ) -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Posts notifications to one Discord webhook URL.
#[derive(Clone)]
pub struct DiscordWebhook {
    http: reqwest::Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        DiscordWebhook {
            http,
            url: url.into(),
        }
    }

    async fn post(&self, payload: &WebhookPayload) -> Result<(), DeliveryError> {
        trace!("Posting webhook payload");
        let resp = self
            .http
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(DeliveryError::from_reqwest)?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp.text().await.unwrap_or_default();
        Err(DeliveryError::from_status(
            status.as_u16(),
            retry_after.as_deref(),
            &body,
        ))
    }
}

// The URL embeds the webhook token.
impl std::fmt::Debug for DiscordWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordWebhook").finish_non_exhaustive()
    }
}

impl NotificationSink for DiscordWebhook {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.post(&WebhookPayload::from(notification)).await
    }
}

/// Resolves the cooldown after a backpressure signal.
pub fn backpressure_cooldown(hint: Option<Duration>, default: Duration) -> Duration {
    hint.unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::NotificationField;
    use crate::webhook::DeliveryErrorKind;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/hook", addr)
    }

    fn notification() -> Notification {
        Notification {
            title: "Portal 2".to_string(),
            body_text: "Fixes.".to_string(),
            link_url: "https://example.com/n".to_string(),
            image_url: None,
            fields: vec![NotificationField::new("Build ID", "87654321")],
            detected_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn posts_rendered_payload() {
        let seen: Arc<Mutex<Option<serde_json::Value>>> = Arc::default();
        let captured = seen.clone();
        let app = Router::new().route(
            "/hook",
            post(move |axum::Json(body): axum::Json<serde_json::Value>| {
                let captured = captured.clone();
                async move {
                    *captured.lock().unwrap() = Some(body);
                    StatusCode::NO_CONTENT
                }
            }),
        );
        let hook = DiscordWebhook::new(reqwest::Client::new(), serve(app).await);

        hook.deliver(&notification()).await.unwrap();

        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["embeds"][0]["title"], "Portal 2");
        assert_eq!(body["embeds"][0]["fields"][0]["value"], "87654321");
        assert_eq!(body["components"][0]["components"][0]["label"], "View Patch");
    }

    #[tokio::test]
    async fn status_429_is_backpressure_with_header_cooldown() {
        let app = Router::new().route(
            "/hook",
            post(|| async {
                let mut headers = HeaderMap::new();
                headers.insert("retry-after", "3".parse().unwrap());
                (StatusCode::TOO_MANY_REQUESTS, headers, "{}")
            }),
        );
        let hook = DiscordWebhook::new(reqwest::Client::new(), serve(app).await);

        let err = hook.deliver(&notification()).await.unwrap_err();

        assert_eq!(
            err.kind,
            DeliveryErrorKind::Backpressure {
                retry_after: Some(Duration::from_secs(3))
            }
        );
    }

    #[tokio::test]
    async fn status_429_reads_body_retry_after() {
        let app = Router::new().route(
            "/hook",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    r#"{"message": "You are being rate limited.", "retry_after": 0.25, "global": false}"#,
                )
            }),
        );
        let hook = DiscordWebhook::new(reqwest::Client::new(), serve(app).await);

        let err = hook.deliver(&notification()).await.unwrap_err();

        assert_eq!(err.backpressure_hint(), Some(Some(Duration::from_millis(250))));
    }

    #[tokio::test]
    async fn bad_request_is_failure() {
        let app = Router::new().route(
            "/hook",
            post(|| async { (StatusCode::BAD_REQUEST, r#"{"message": "Invalid Form Body"}"#) }),
        );
        let hook = DiscordWebhook::new(reqwest::Client::new(), serve(app).await);

        let err = hook.deliver(&notification()).await.unwrap_err();

        assert_eq!(err.kind, DeliveryErrorKind::Failed);
        assert_eq!(err.status_code, Some(400));
    }

    #[test]
    fn cooldown_prefers_hint() {
        let default = Duration::from_secs(60);
        assert_eq!(
            backpressure_cooldown(Some(Duration::from_secs(2)), default),
            Duration::from_secs(2)
        );
        assert_eq!(backpressure_cooldown(None, default), default);
    }

    #[test]
    fn debug_hides_url() {
        let hook = DiscordWebhook::new(
            reqwest::Client::new(),
            "https://discord.com/api/webhooks/1/secret-token",
        );
        assert!(!format!("{hook:?}").contains("secret-token"));
    }
}
