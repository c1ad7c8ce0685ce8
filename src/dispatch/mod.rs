//! The dispatch loop: drains the pending queue at a fixed rate.
//!
//! Every tick takes at most one item off the front of the queue, enriches it
//! and hands it to the sink. Outcomes:
//!
//! - delivered: the item is gone
//! - backpressure: the item goes back to the front and dispatch pauses for the
//!   signalled cooldown (or the configured default)
//! - any other failure: the item is logged and dropped
//!
//! Ticks are never bunched up after a pause; the interval restarts when the
//! cooldown ends.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::DispatchConfig;
use crate::enrich::Enricher;
use crate::queue::PendingQueue;
use crate::shutdown::sleep_or_shutdown;
use crate::upstream::UpstreamSource;
use crate::webhook::{NotificationSink, backpressure_cooldown};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The queue was empty.
    Idle,

    Sent,

    /// The sink pushed back; the item is at the front again.
    Requeued { cooldown: Duration },

    /// Delivery failed for good.
    Dropped,
}

pub struct Dispatcher<S, K> {
    queue: PendingQueue,
    enricher: Enricher<S>,
    sink: Arc<K>,
    config: DispatchConfig,
}

impl<S: UpstreamSource, K: NotificationSink> Dispatcher<S, K> {
    pub fn new(
        queue: PendingQueue,
        enricher: Enricher<S>,
        sink: Arc<K>,
        config: DispatchConfig,
    ) -> Self {
        Dispatcher {
            queue,
            enricher,
            sink,
            config,
        }
    }

    /// Ticks until `shutdown` fires. Items still queued at that point are lost.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(interval_ms = self.config.interval.as_millis() as u64, "Dispatch loop started");
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let TickOutcome::Requeued { cooldown } = self.tick().await {
                if !sleep_or_shutdown(cooldown, &shutdown).await {
                    break;
                }
                ticker.reset();
            }
        }

        let remaining = self.queue.len().await;
        if remaining > 0 {
            warn!(remaining, "Dispatch loop stopped with undelivered notifications");
        } else {
            info!("Dispatch loop stopped");
        }
    }

    /// Processes at most one queued item.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> TickOutcome {
        let Some(item) = self.queue.pop().await else {
            return TickOutcome::Idle;
        };

        let notification = self.enricher.enrich(&item).await;
        match self.sink.deliver(&notification).await {
            Ok(()) => {
                info!(entity = %item.entity_name, token = %item.change.token, "Notification sent");
                TickOutcome::Sent
            }
            Err(e) => match e.backpressure_hint() {
                Some(hint) => {
                    let cooldown = backpressure_cooldown(hint, self.config.default_cooldown);
                    warn!(
                        entity = %item.entity_name,
                        cooldown_ms = cooldown.as_millis() as u64,
                        "Webhook rate limited, requeueing"
                    );
                    self.queue.push_front(item).await;
                    TickOutcome::Requeued { cooldown }
                }
                None => {
                    error!(
                        entity = %item.entity_name,
                        token = %item.change.token,
                        error = %e,
                        "Dropping notification"
                    );
                    TickOutcome::Dropped
                }
            },
        }
    }
}
