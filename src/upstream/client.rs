//! Steam Web API client.
//!
//! Two endpoints are used:
//!
//! - `ISteamNews/GetNewsForApp/v2` for the change feed (the item `gid` is the
//!   change token).
//! - `store.steampowered.com/api/appdetails` for the header image.
//!
//! Every request is bounded by the client-wide timeout.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use tracing::trace;

use super::error::UpstreamError;
use super::source::{FeedWindow, UpstreamSource};
use crate::types::{AppId, ChangeRecord};

/// User agent sent with every upstream request.
const USER_AGENT: &str = concat!("patchwatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct NewsResponse {
    appnews: Option<AppNews>,
}

#[derive(Debug, Deserialize)]
struct AppNews {
    #[serde(default)]
    newsitems: Vec<ChangeRecord>,
}

#[derive(Debug, Deserialize)]
struct AppDetailsEntry {
    #[serde(default)]
    success: bool,
    data: Option<AppDetailsData>,
}

#[derive(Debug, Deserialize)]
struct AppDetailsData {
    header_image: Option<String>,
}

/// A Steam Web API client.
#[derive(Clone)]
pub struct SteamClient {
    http: reqwest::Client,
    api_base: String,
    store_base: String,
}

impl SteamClient {
    /// Creates a client from a pre-configured reqwest client.
    pub fn with_client(
        http: reqwest::Client,
        api_base: impl Into<String>,
        store_base: impl Into<String>,
    ) -> Self {
        SteamClient {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            store_base: store_base.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_news(
        &self,
        app_id: AppId,
        window: FeedWindow,
    ) -> Result<Vec<ChangeRecord>, UpstreamError> {
        let url = format!("{}/ISteamNews/GetNewsForApp/v2/", self.api_base);
        trace!(%app_id, count = window.count, "Fetching news");

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("appid", app_id.0.to_string()),
                ("count", window.count.to_string()),
                ("maxlength", window.max_length.to_string()),
            ])
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;
        let resp = check_response(resp).await?;

        let body: NewsResponse = resp.json().await.map_err(UpstreamError::from_reqwest)?;
        Ok(body.appnews.map(|news| news.newsitems).unwrap_or_default())
    }

    async fn fetch_header_image(&self, app_id: AppId) -> Result<Option<String>, UpstreamError> {
        let url = format!("{}/api/appdetails", self.store_base);
        trace!(%app_id, "Fetching app details");

        let resp = self
            .http
            .get(&url)
            .query(&[("appids", app_id.0.to_string())])
            .send()
            .await
            .map_err(UpstreamError::from_reqwest)?;
        let resp = check_response(resp).await?;

        let body: HashMap<String, AppDetailsEntry> =
            resp.json().await.map_err(UpstreamError::from_reqwest)?;
        Ok(header_image_from(body, app_id))
    }
}

impl std::fmt::Debug for SteamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SteamClient")
            .field("api_base", &self.api_base)
            .field("store_base", &self.store_base)
            .finish_non_exhaustive()
    }
}

impl UpstreamSource for SteamClient {
    async fn recent_changes(
        &self,
        app_id: AppId,
        window: FeedWindow,
    ) -> Result<Vec<ChangeRecord>, UpstreamError> {
        self.fetch_news(app_id, window).await
    }

    async fn display_image(&self, app_id: AppId) -> Result<Option<String>, UpstreamError> {
        self.fetch_header_image(app_id).await
    }
}

/// Builds the shared reqwest client with a per-request timeout.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, UpstreamError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(UpstreamError::from_reqwest)
}

/// Returns the response unchanged on success, otherwise a categorized error.
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(UpstreamError::from_status(status.as_u16(), &body))
}

fn header_image_from(mut body: HashMap<String, AppDetailsEntry>, app_id: AppId) -> Option<String> {
    let entry = body.remove(&app_id.to_string())?;
    if !entry.success {
        return None;
    }
    entry
        .data
        .and_then(|data| data.header_image)
        .filter(|url| !url.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeToken;
    use crate::upstream::UpstreamErrorKind;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;

    /// Serves `app` on an ephemeral local port and returns its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base: &str) -> SteamClient {
        let http = build_http_client(Duration::from_secs(5)).unwrap();
        SteamClient::with_client(http, base, base)
    }

    #[tokio::test]
    async fn parses_news_items_newest_first() {
        let app = Router::new().route(
            "/ISteamNews/GetNewsForApp/v2/",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("appid").map(String::as_str), Some("570"));
                assert_eq!(q.get("count").map(String::as_str), Some("1"));
                axum::Json(serde_json::json!({
                    "appnews": {
                        "appid": 570,
                        "newsitems": [
                            {"gid": "200", "title": "Patch", "url": "", "contents": "x", "date": 2},
                        ],
                        "count": 1
                    }
                }))
            }),
        );
        let client = client_for(&serve(app).await);

        let records = client
            .recent_changes(AppId(570), FeedWindow::LATEST)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].token, ChangeToken::new("200"));
    }

    #[tokio::test]
    async fn missing_appnews_is_empty_feed() {
        let app = Router::new().route(
            "/ISteamNews/GetNewsForApp/v2/",
            get(|| async { axum::Json(serde_json::json!({})) }),
        );
        let client = client_for(&serve(app).await);

        let records = client
            .recent_changes(AppId(1), FeedWindow::LATEST)
            .await
            .unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn status_429_is_rate_limited() {
        let app = Router::new().route(
            "/ISteamNews/GetNewsForApp/v2/",
            get(|| async { StatusCode::TOO_MANY_REQUESTS }),
        );
        let client = client_for(&serve(app).await);

        let err = client
            .recent_changes(AppId(1), FeedWindow::LATEST)
            .await
            .unwrap_err();

        assert_eq!(err.kind, UpstreamErrorKind::RateLimited);
        assert_eq!(err.status_code, Some(429));
    }

    #[tokio::test]
    async fn status_502_is_transient() {
        let app = Router::new().route(
            "/ISteamNews/GetNewsForApp/v2/",
            get(|| async { StatusCode::BAD_GATEWAY }),
        );
        let client = client_for(&serve(app).await);

        let err = client
            .recent_changes(AppId(1), FeedWindow::LATEST)
            .await
            .unwrap_err();

        assert_eq!(err.kind, UpstreamErrorKind::Transient);
    }

    #[tokio::test]
    async fn malformed_body_is_transient() {
        let app = Router::new().route(
            "/ISteamNews/GetNewsForApp/v2/",
            get(|| async { "<html>not json</html>" }),
        );
        let client = client_for(&serve(app).await);

        let err = client
            .recent_changes(AppId(1), FeedWindow::LATEST)
            .await
            .unwrap_err();

        assert_eq!(err.kind, UpstreamErrorKind::Transient);
    }

    #[tokio::test]
    async fn reads_header_image_from_app_details() {
        let app = Router::new().route(
            "/api/appdetails",
            get(|| async {
                axum::Json(serde_json::json!({
                    "620": {
                        "success": true,
                        "data": {"header_image": "https://cdn.example/620/header.jpg"}
                    }
                }))
            }),
        );
        let client = client_for(&serve(app).await);

        let image = client.display_image(AppId(620)).await.unwrap();

        assert_eq!(image.as_deref(), Some("https://cdn.example/620/header.jpg"));
    }

    #[test]
    fn unsuccessful_app_details_has_no_image() {
        let body: HashMap<String, AppDetailsEntry> =
            serde_json::from_str(r#"{"620": {"success": false}}"#).unwrap();
        assert_eq!(header_image_from(body, AppId(620)), None);
    }

    #[test]
    fn app_details_for_other_app_has_no_image() {
        let body: HashMap<String, AppDetailsEntry> = serde_json::from_str(
            r#"{"10": {"success": true, "data": {"header_image": "https://x"}}}"#,
        )
        .unwrap();
        assert_eq!(header_image_from(body, AppId(620)), None);
    }

    #[test]
    fn base_urls_lose_trailing_slash() {
        let http = reqwest::Client::new();
        let client = SteamClient::with_client(http, "http://a/", "http://b/");
        assert_eq!(client.api_base, "http://a");
        assert_eq!(client.store_base, "http://b");
    }
}
