//! Optional HTTP status server.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns 200 if the process is running
//! - `GET /api/v1/status` - Returns scan progress, queue depth and checkpoint
//!   count as JSON

use std::sync::Arc;

use tokio::sync::watch;

use crate::persistence::CheckpointStore;
use crate::queue::PendingQueue;
use crate::scan::ScanProgress;

pub mod health;
pub mod status;

pub use health::health_handler;
pub use status::{StatusReport, status_handler};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    queue: PendingQueue,
    checkpoints: CheckpointStore,
    progress: watch::Receiver<ScanProgress>,
}

impl AppState {
    pub fn new(
        queue: PendingQueue,
        checkpoints: CheckpointStore,
        progress: watch::Receiver<ScanProgress>,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                queue,
                checkpoints,
                progress,
            }),
        }
    }

    pub fn queue(&self) -> &PendingQueue {
        &self.inner.queue
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.inner.checkpoints
    }

    pub fn progress(&self) -> &watch::Receiver<ScanProgress> {
        &self.inner.progress
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/status", get(status_handler))
        .with_state(app_state)
}
