//! Shared test utilities: record builders and scripted fakes for the
//! upstream and webhook seams.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::enrich::Notification;
use crate::types::{AppId, ChangeRecord, ChangeToken, Entity, WorkItem};
use crate::upstream::{FeedWindow, UpstreamError, UpstreamSource};
use crate::webhook::{DeliveryError, NotificationSink};

/// A news item with a title and no body.
pub fn news(gid: &str, title: &str) -> ChangeRecord {
    news_with_body(gid, title, "")
}

pub fn news_with_body(gid: &str, title: &str, body: &str) -> ChangeRecord {
    ChangeRecord {
        token: ChangeToken::new(gid),
        title: title.to_string(),
        body_text: body.to_string(),
        url: String::new(),
        timestamp: 0,
    }
}

/// A work item for `name` whose change record has token `gid`.
pub fn work_item(name: &str, app_id: u64, gid: &str) -> WorkItem {
    WorkItem::new(
        &Entity::new(name, app_id),
        news(gid, &format!("{name} update {gid}")),
    )
}

#[derive(Debug, Default)]
struct UpstreamState {
    feeds: HashMap<AppId, Vec<ChangeRecord>>,
    failures: HashMap<AppId, VecDeque<UpstreamError>>,
    images: HashMap<AppId, String>,
    failing_images: HashSet<AppId>,
    feed_calls: HashMap<AppId, usize>,
    call_log: Vec<AppId>,
}

/// Scripted [`UpstreamSource`].
///
/// Feeds are returned newest first and cut to the requested window. Errors
/// queued with [`fail_next`](Self::fail_next) are returned, one per call,
/// before the feed is served again. Apps with no feed set have no news.
#[derive(Debug, Clone, Default)]
pub struct FakeUpstream {
    state: Arc<Mutex<UpstreamState>>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        FakeUpstream::default()
    }

    pub fn set_feed(&self, app_id: u64, records: Vec<ChangeRecord>) {
        self.state
            .lock()
            .unwrap()
            .feeds
            .insert(AppId(app_id), records);
    }

    /// Publishes a new newest record for `app_id`.
    pub fn publish(&self, app_id: u64, record: ChangeRecord) {
        self.state
            .lock()
            .unwrap()
            .feeds
            .entry(AppId(app_id))
            .or_default()
            .insert(0, record);
    }

    pub fn fail_next(&self, app_id: u64, error: UpstreamError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(AppId(app_id))
            .or_default()
            .push_back(error);
    }

    pub fn set_image(&self, app_id: u64, url: &str) {
        self.state
            .lock()
            .unwrap()
            .images
            .insert(AppId(app_id), url.to_string());
    }

    pub fn fail_image(&self, app_id: u64) {
        self.state
            .lock()
            .unwrap()
            .failing_images
            .insert(AppId(app_id));
    }

    /// Number of feed requests made for `app_id`, failed ones included.
    pub fn feed_calls(&self, app_id: u64) -> usize {
        self.state
            .lock()
            .unwrap()
            .feed_calls
            .get(&AppId(app_id))
            .copied()
            .unwrap_or(0)
    }

    /// Every feed request in the order it was made.
    pub fn call_log(&self) -> Vec<AppId> {
        self.state.lock().unwrap().call_log.clone()
    }
}

impl UpstreamSource for FakeUpstream {
    async fn recent_changes(
        &self,
        app_id: AppId,
        window: FeedWindow,
    ) -> Result<Vec<ChangeRecord>, UpstreamError> {
        let mut state = self.state.lock().unwrap();
        *state.feed_calls.entry(app_id).or_default() += 1;
        state.call_log.push(app_id);

        if let Some(err) = state.failures.get_mut(&app_id).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(state
            .feeds
            .get(&app_id)
            .map(|feed| feed.iter().take(window.count as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn display_image(&self, app_id: AppId) -> Result<Option<String>, UpstreamError> {
        let state = self.state.lock().unwrap();
        if state.failing_images.contains(&app_id) {
            return Err(UpstreamError::transient_without_source("image lookup failed"));
        }
        Ok(state.images.get(&app_id).cloned())
    }
}

#[derive(Debug, Default)]
struct SinkState {
    delivered: Vec<Notification>,
    script: VecDeque<DeliveryError>,
    attempted: Vec<String>,
}

/// Recording [`NotificationSink`].
///
/// Deliveries succeed unless an error was scripted; scripted errors are
/// consumed one per attempt. Only successful deliveries are recorded.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    state: Arc<Mutex<SinkState>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink::default()
    }

    pub fn backpressure_next(&self, retry_after: Option<Duration>) {
        self.state
            .lock()
            .unwrap()
            .script
            .push_back(DeliveryError::backpressure(retry_after));
    }

    pub fn fail_next(&self, message: &str) {
        self.state
            .lock()
            .unwrap()
            .script
            .push_back(DeliveryError::failed_without_source(message));
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.state.lock().unwrap().delivered.clone()
    }

    pub fn delivered_titles(&self) -> Vec<String> {
        self.delivered().into_iter().map(|n| n.title).collect()
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempted.len()
    }

    /// Titles of every delivery attempt, failed ones included, in order.
    pub fn attempted_titles(&self) -> Vec<String> {
        self.state.lock().unwrap().attempted.clone()
    }
}

impl NotificationSink for RecordingSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let mut state = self.state.lock().unwrap();
        state.attempted.push(notification.title.clone());
        if let Some(err) = state.script.pop_front() {
            return Err(err);
        }
        state.delivered.push(notification.clone());
        Ok(())
    }
}
