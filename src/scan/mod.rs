//! The scan loop: walks the catalog in fixed order, one pass after another.
//!
//! Each entity goes through [`ChangeDetector::detect`]. Changed entities are
//! pushed onto the [`PendingQueue`]; everything else only moves the checkpoint
//! (or nothing at all). Progress is published on a `watch` channel for the
//! status endpoint.
//!
//! Pacing:
//! - `request_delay` between consecutive entities
//! - `rate_limit_cooldown` whenever the upstream rate-limits, after which the
//!   same entity is retried
//! - `pass_interval` between passes
//!
//! Checkpoints are flushed every `checkpoint_every` entities and at the end of
//! every pass, so a crash loses at most that many entities' progress.

mod state;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::ScanConfig;
use crate::detect::{ChangeDetector, DetectError, Detection};
use crate::persistence::CheckpointStore;
use crate::queue::PendingQueue;
use crate::shutdown::sleep_or_shutdown;
use crate::types::{Entity, WorkItem};
use crate::upstream::UpstreamSource;

pub use state::{PassSummary, ScanProgress, ScanState};

/// Drives change detection over the whole catalog.
pub struct Scanner<S> {
    catalog: Arc<[Entity]>,
    detector: ChangeDetector<S>,
    checkpoints: CheckpointStore,
    queue: PendingQueue,
    config: ScanConfig,
    progress: watch::Sender<ScanProgress>,
}

impl<S: UpstreamSource> Scanner<S> {
    pub fn new(
        catalog: impl Into<Arc<[Entity]>>,
        source: Arc<S>,
        checkpoints: CheckpointStore,
        queue: PendingQueue,
        config: ScanConfig,
    ) -> Self {
        let detector = ChangeDetector::new(source, checkpoints.clone(), config.retry);
        let (progress, _) = watch::channel(ScanProgress::default());
        Scanner {
            catalog: catalog.into(),
            detector,
            checkpoints,
            queue,
            config,
            progress,
        }
    }

    /// Returns a receiver that always holds the latest progress snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ScanProgress> {
        self.progress.subscribe()
    }

    /// Runs passes until `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(entities = self.catalog.len(), "Scan loop started");
        loop {
            let summary = self.run_pass(&shutdown).await;
            if summary.cancelled {
                break;
            }
            self.progress.send_modify(|p| p.passes_completed += 1);

            if !sleep_or_shutdown(self.config.pass_interval, &shutdown).await {
                break;
            }
        }
        info!("Scan loop stopped");
    }

    /// Runs one pass over the catalog.
    ///
    /// Cancellation is honoured between entities and during waits; an
    /// in-flight detection always completes. Checkpoints are flushed before
    /// returning whether or not the pass was cancelled.
    #[instrument(skip_all, fields(entities = self.catalog.len()))]
    pub async fn run_pass(&self, shutdown: &CancellationToken) -> PassSummary {
        let total = self.catalog.len();
        let mut summary = PassSummary::default();
        let mut since_flush = 0usize;
        info!("Pass started");

        'entities: for (index, entity) in self.catalog.iter().enumerate() {
            if index > 0 && !sleep_or_shutdown(self.config.request_delay, shutdown).await {
                summary.cancelled = true;
                break;
            }
            if shutdown.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            self.publish(ScanState::Scanning { index, total });

            loop {
                match self.detector.detect(entity).await {
                    Ok(detection) => {
                        self.apply(entity, detection, &mut summary).await;
                        break;
                    }
                    Err(DetectError::RateLimited(e)) => {
                        summary.rate_limit_pauses += 1;
                        let cooldown = self.config.rate_limit_cooldown;
                        let until = pause_deadline(cooldown);
                        warn!(
                            entity = %entity.name,
                            error = %e,
                            cooldown_secs = cooldown.as_secs(),
                            "Upstream rate limited, pausing scan"
                        );
                        self.publish(ScanState::Paused { until });
                        if !sleep_or_shutdown(cooldown, shutdown).await {
                            summary.cancelled = true;
                            break 'entities;
                        }
                        self.publish(ScanState::Scanning { index, total });
                    }
                    Err(e) => {
                        warn!(entity = %entity.name, error = %e, "Skipping entity this pass");
                        summary.failed += 1;
                        break;
                    }
                }
            }
            summary.scanned += 1;

            since_flush += 1;
            if since_flush >= self.config.checkpoint_every {
                self.flush_checkpoints().await;
                since_flush = 0;
            }
        }

        self.flush_checkpoints().await;
        self.publish(ScanState::Idle);

        info!(
            scanned = summary.scanned,
            changed = summary.changed,
            unseen = summary.unseen,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Pass finished"
        );
        summary
    }

    async fn apply(&self, entity: &Entity, detection: Detection, summary: &mut PassSummary) {
        match detection {
            Detection::Unseen { .. } => summary.unseen += 1,
            Detection::Unchanged => summary.unchanged += 1,
            Detection::NoRecords => summary.no_records += 1,
            Detection::Changed { previous, record } => {
                info!(
                    entity = %entity.name,
                    %previous,
                    token = %record.token,
                    title = %record.title,
                    "Change detected, queueing notification"
                );
                summary.changed += 1;
                self.queue.push(WorkItem::new(entity, record)).await;
            }
        }
    }

    async fn flush_checkpoints(&self) {
        // A failed flush leaves the store dirty; the next flush retries.
        if let Err(e) = self.checkpoints.flush().await {
            error!(
                path = %self.checkpoints.path().display(),
                error = %e,
                "Failed to flush checkpoints"
            );
        }
    }

    fn publish(&self, state: ScanState) {
        self.progress.send_modify(|p| p.state = state);
    }
}

fn pause_deadline(cooldown: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(cooldown)
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
