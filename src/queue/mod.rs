//! In-memory pending-notification queue shared by the scan and dispatch loops.
//!
//! Items are served FIFO. A delivery that hits webhook backpressure is put back
//! at the front with [`PendingQueue::push_front`], so it is retried before
//! anything enqueued after it. There is no retry cap: the only thing that can
//! hold an item at the front is backpressure, which always ends.
//!
//! The queue is not persisted; its contents only live as long as the process.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::types::WorkItem;

/// Shared handle to the pending queue.
///
/// Cloning the handle is cheap; all clones operate on the same queue.
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    items: Arc<Mutex<VecDeque<WorkItem>>>,
}

impl PendingQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        PendingQueue::default()
    }

    /// Appends an item at the back.
    pub async fn push(&self, item: WorkItem) {
        self.items.lock().await.push_back(item);
    }

    /// Reinserts an item at the front, ahead of everything already queued.
    pub async fn push_front(&self, item: WorkItem) {
        self.items.lock().await.push_front(item);
    }

    /// Removes and returns the front item, or `None` if the queue is empty.
    pub async fn pop(&self) -> Option<WorkItem> {
        self.items.lock().await.pop_front()
    }

    /// Returns the number of queued items.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// Returns true if the queue is empty.
    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::work_item;

    #[tokio::test]
    async fn pop_on_empty_returns_none() {
        let queue = PendingQueue::new();
        assert!(queue.pop().await.is_none());
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn items_are_served_fifo() {
        let queue = PendingQueue::new();
        queue.push(work_item("A", 1, "a1")).await;
        queue.push(work_item("B", 2, "b1")).await;
        queue.push(work_item("C", 3, "c1")).await;

        let order: Vec<_> = [
            queue.pop().await.unwrap(),
            queue.pop().await.unwrap(),
            queue.pop().await.unwrap(),
        ]
        .into_iter()
        .map(|item| item.entity_name.0)
        .collect();

        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn requeued_item_is_served_before_newer_items() {
        let queue = PendingQueue::new();
        queue.push(work_item("A", 1, "a1")).await;
        queue.push(work_item("B", 2, "b1")).await;

        let first = queue.pop().await.unwrap();
        queue.push(work_item("C", 3, "c1")).await;
        queue.push_front(first).await;

        assert_eq!(queue.pop().await.unwrap().entity_name.as_str(), "A");
        assert_eq!(queue.pop().await.unwrap().entity_name.as_str(), "B");
        assert_eq!(queue.pop().await.unwrap().entity_name.as_str(), "C");
    }

    #[tokio::test]
    async fn clones_share_the_same_queue() {
        let producer = PendingQueue::new();
        let consumer = producer.clone();

        producer.push(work_item("A", 1, "a1")).await;

        assert_eq!(consumer.len().await, 1);
        assert!(consumer.pop().await.is_some());
        assert!(producer.is_empty().await);
    }
}
