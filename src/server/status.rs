//! Read-only view of the watcher's progress.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::AppState;
use crate::scan::ScanState;

/// Body of `GET /api/v1/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub scan: ScanState,
    pub queue_depth: usize,
    pub checkpoints: usize,
    pub passes_completed: u64,
}

/// Reports the scan state, pending queue depth and checkpoint count.
///
/// ```ignore
/// GET /api/v1/status HTTP/1.1
///
/// HTTP/1.1 200 OK
/// Content-Type: application/json
///
/// {"scan":{"state":"scanning","index":12,"total":480},"queue_depth":1,"checkpoints":480,"passes_completed":3}
/// ```
pub async fn status_handler(State(app_state): State<AppState>) -> Json<StatusReport> {
    let progress = app_state.progress().borrow().clone();
    Json(StatusReport {
        scan: progress.state,
        queue_depth: app_state.queue().len().await,
        checkpoints: app_state.checkpoints().len().await,
        passes_completed: progress.passes_completed,
    })
}
