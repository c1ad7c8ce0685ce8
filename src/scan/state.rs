//! Observable scan progress, published over a `watch` channel.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What the scan loop is doing right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanState {
    /// Between passes.
    Idle,

    /// Working through the catalog; `index` is zero-based.
    Scanning { index: usize, total: usize },

    /// Waiting out an upstream rate limit.
    Paused { until: DateTime<Utc> },
}

/// Snapshot published after every state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanProgress {
    pub state: ScanState,
    pub passes_completed: u64,
}

impl Default for ScanProgress {
    fn default() -> Self {
        ScanProgress {
            state: ScanState::Idle,
            passes_completed: 0,
        }
    }
}

/// Per-pass tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub scanned: usize,
    pub unseen: usize,
    pub unchanged: usize,
    pub changed: usize,
    pub no_records: usize,
    pub failed: usize,
    pub rate_limit_pauses: usize,

    /// True if shutdown interrupted the pass.
    pub cancelled: bool,
}
