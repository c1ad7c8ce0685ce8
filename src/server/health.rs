//! Liveness endpoint.

use axum::http::StatusCode;

/// Returns 200 with the body `OK` while the process is serving requests.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
