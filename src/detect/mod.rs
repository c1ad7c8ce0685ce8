//! Per-entity change detection.
//!
//! The detector fetches the newest change record for one entity and compares
//! its token against the checkpoint store:
//!
//! | checkpoint | fetched token | outcome | checkpoint write |
//! |---|---|---|---|
//! | absent | `T` | [`Detection::Unseen`] | `T` |
//! | `A` | `A` | [`Detection::Unchanged`] | none |
//! | `A` | `B` | [`Detection::Changed`] | `B` |
//! | any | (no records) | [`Detection::NoRecords`] | none |
//!
//! Only `Changed` produces something to announce. `Unseen` establishes the
//! baseline silently, so a cold start never floods the webhook.
//!
//! Failures never touch the checkpoint store.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::persistence::CheckpointStore;
use crate::types::{ChangeRecord, ChangeToken, Entity};
use crate::upstream::{
    FeedWindow, RetryConfig, RetryResult, UpstreamError, UpstreamSource, retry_with_backoff,
};

/// Outcome of a successful detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// First observation of this entity; baseline recorded, nothing to announce.
    Unseen { token: ChangeToken },

    /// The newest record is the one already checkpointed.
    Unchanged,

    /// A new record replaced the checkpointed one.
    Changed {
        previous: ChangeToken,
        record: ChangeRecord,
    },

    /// The entity has no change records at all.
    NoRecords,
}

/// Why detection failed for an entity.
#[derive(Debug, Error)]
pub enum DetectError {
    /// The upstream signalled rate limiting; the whole scan must pause.
    #[error("upstream rate limited: {0}")]
    RateLimited(#[source] UpstreamError),

    /// Every attempt failed transiently.
    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted {
        attempts: u32,
        #[source]
        last_error: UpstreamError,
    },

    /// The upstream rejected the request outright.
    #[error("permanent upstream error: {0}")]
    Permanent(#[source] UpstreamError),
}

/// Classifies entities against the checkpoint store.
#[derive(Debug)]
pub struct ChangeDetector<S> {
    source: Arc<S>,
    checkpoints: CheckpointStore,
    retry: RetryConfig,
}

impl<S: UpstreamSource> ChangeDetector<S> {
    pub fn new(source: Arc<S>, checkpoints: CheckpointStore, retry: RetryConfig) -> Self {
        ChangeDetector {
            source,
            checkpoints,
            retry,
        }
    }

    /// Fetches the newest record for `entity` and classifies it.
    ///
    /// On `Unseen` and `Changed` the checkpoint is updated before returning.
    #[instrument(skip(self, entity), fields(entity = %entity.name, app_id = %entity.app_id))]
    pub async fn detect(&self, entity: &Entity) -> Result<Detection, DetectError> {
        let source = &*self.source;
        let app_id = entity.app_id;
        let result =
            retry_with_backoff(self.retry, || source.recent_changes(app_id, FeedWindow::LATEST))
                .await;

        let records = match result {
            RetryResult::Success(records) => records,
            RetryResult::RateLimited(e) => return Err(DetectError::RateLimited(e)),
            RetryResult::PermanentError(e) => return Err(DetectError::Permanent(e)),
            RetryResult::ExhaustedRetries {
                last_error,
                attempts,
            } => {
                return Err(DetectError::Exhausted {
                    attempts,
                    last_error,
                });
            }
        };

        let Some(latest) = records.into_iter().next() else {
            debug!("No change records");
            return Ok(Detection::NoRecords);
        };

        match self.checkpoints.get(&entity.name).await {
            None => {
                debug!(token = %latest.token, "First sighting, recording baseline");
                self.checkpoints
                    .record(entity.name.clone(), latest.token.clone())
                    .await;
                Ok(Detection::Unseen {
                    token: latest.token,
                })
            }
            Some(previous) if previous == latest.token => {
                debug!("No new change");
                Ok(Detection::Unchanged)
            }
            Some(previous) => {
                debug!(%previous, token = %latest.token, "New change detected");
                self.checkpoints
                    .record(entity.name.clone(), latest.token.clone())
                    .await;
                Ok(Detection::Changed {
                    previous,
                    record: latest,
                })
            }
        }
    }
}
