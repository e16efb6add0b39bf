//! Strict-priority crawl frontier
//!
//! Three FIFO queues, one per tier. HIGH drains before MEDIUM, MEDIUM before
//! LOW. The frontier also tracks which URLs are queued or in flight, so the
//! same URL can never be queued twice or dispatched twice at once, and it
//! detects quiescence: nothing queued and nothing in flight.

use crate::state::{Priority, UrlTask};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

/// Result of offering a task to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Task was queued
    Queued,
    /// The URL is already queued or in flight
    Duplicate,
    /// The frontier is full and the task's tier could not make room
    Dropped,
    /// The frontier no longer accepts tasks
    Closed,
}

/// Concurrency-safe multi-tier queue of pending URL tasks
pub struct PriorityFrontier {
    inner: Mutex<FrontierInner>,
    notify: Notify,
    capacity: usize,
}

#[derive(Default)]
struct FrontierInner {
    tiers: [VecDeque<UrlTask>; 3],
    /// URLs queued or in flight
    reserved: HashSet<String>,
    in_flight: usize,
    closed: bool,
    dropped: u64,
}

impl FrontierInner {
    fn queued(&self) -> usize {
        self.tiers.iter().map(VecDeque::len).sum()
    }

    fn pop(&mut self) -> Option<UrlTask> {
        self.tiers.iter_mut().find_map(VecDeque::pop_front)
    }

    /// Evicts the newest task from the lowest tier strictly below `incoming`
    fn evict_below(&mut self, incoming: Priority) -> Option<UrlTask> {
        let task = Priority::ALL
            .iter()
            .rev()
            .filter(|tier| **tier > incoming)
            .find_map(|tier| self.tiers[tier.index()].pop_back())?;
        self.reserved.remove(task.as_str());
        Some(task)
    }

    fn is_quiescent(&self) -> bool {
        self.in_flight == 0 && self.queued() == 0
    }
}

impl PriorityFrontier {
    /// Creates an empty frontier holding at most `capacity` queued tasks
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(FrontierInner::default()),
            notify: Notify::new(),
            capacity: capacity.max(1),
        }
    }

    /// Queues a task in its tier
    ///
    /// The URL is reserved until the task completes, so a second enqueue of the
    /// same URL is rejected while the first is queued or in flight. When the
    /// frontier is full, the newest task of a lower tier is evicted to make room;
    /// if there is no lower-tier task the incoming task is dropped.
    pub fn enqueue(&self, task: UrlTask) -> EnqueueOutcome {
        let mut inner = self.lock();

        if inner.closed {
            return EnqueueOutcome::Closed;
        }
        if inner.reserved.contains(task.as_str()) {
            return EnqueueOutcome::Duplicate;
        }

        if inner.queued() >= self.capacity {
            match inner.evict_below(task.priority) {
                Some(evicted) => {
                    inner.dropped += 1;
                    tracing::warn!(
                        "Frontier full, evicted {} task {}",
                        evicted.priority,
                        evicted.url
                    );
                }
                None => {
                    inner.dropped += 1;
                    tracing::warn!("Frontier full, dropped {} task {}", task.priority, task.url);
                    return EnqueueOutcome::Dropped;
                }
            }
        }

        inner.reserved.insert(task.as_str().to_string());
        inner.tiers[task.priority.index()].push_back(task);
        drop(inner);

        self.notify.notify_one();
        EnqueueOutcome::Queued
    }

    /// Takes the next task, waiting while the frontier is empty
    ///
    /// Returns None once the frontier is closed and drained. A returned task
    /// counts as in flight until it is passed to `complete` or `requeue`.
    pub async fn dequeue(&self) -> Option<UrlTask> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if let Some(task) = inner.pop() {
                    inner.in_flight += 1;
                    return Some(task);
                }
                if inner.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks an in-flight task as finished and releases its URL
    ///
    /// When this leaves nothing queued and nothing in flight, the crawl is
    /// quiescent and the frontier closes itself.
    pub fn complete(&self, task: &UrlTask) {
        let mut inner = self.lock();
        inner.reserved.remove(task.as_str());
        inner.in_flight = inner.in_flight.saturating_sub(1);

        if inner.is_quiescent() && !inner.closed {
            tracing::debug!("Frontier quiescent, closing");
            inner.closed = true;
            drop(inner);
            self.notify.notify_waiters();
        }
    }

    /// Puts an in-flight task back at the end of its tier
    ///
    /// The URL stays reserved. Requeues ignore the capacity ceiling so that
    /// in-flight work is never lost. Returns false (and releases the task) if
    /// the frontier has been closed.
    pub fn requeue(&self, task: UrlTask) -> bool {
        let mut inner = self.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);

        if inner.closed {
            inner.reserved.remove(task.as_str());
            return false;
        }

        inner.tiers[task.priority.index()].push_back(task);
        drop(inner);

        self.notify.notify_one();
        true
    }

    /// Stops accepting tasks and wakes every blocked dequeuer
    ///
    /// Tasks already queued are still handed out.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    /// Closes the frontier and discards every queued task
    ///
    /// # Returns
    ///
    /// The number of discarded tasks
    pub fn cancel(&self) -> usize {
        let mut inner = self.lock();
        inner.closed = true;

        let mut discarded = 0;
        for tier in 0..inner.tiers.len() {
            let drained: Vec<UrlTask> = inner.tiers[tier].drain(..).collect();
            discarded += drained.len();
            for task in drained {
                inner.reserved.remove(task.as_str());
            }
        }
        drop(inner);

        self.notify.notify_waiters();
        discarded
    }

    /// Number of queued tasks across all tiers
    pub fn len(&self) -> usize {
        self.lock().queued()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of queued tasks in one tier
    pub fn tier_len(&self, priority: Priority) -> usize {
        self.lock().tiers[priority.index()].len()
    }

    /// Number of tasks handed out and not yet completed or requeued
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Tasks dropped or evicted because the frontier was full
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, FrontierInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;

    fn task(s: &str) -> UrlTask {
        UrlTask::new(Url::parse(s).unwrap(), 1).unwrap()
    }

    #[tokio::test]
    async fn test_high_tier_dequeues_first() {
        let frontier = PriorityFrontier::new(100);
        frontier.enqueue(task("https://shop.example/about"));
        frontier.enqueue(task("https://shop.example/category/shoes"));
        frontier.enqueue(task("https://shop.example/p/1234"));

        assert_eq!(frontier.tier_len(Priority::High), 1);
        assert_eq!(frontier.tier_len(Priority::Medium), 1);
        assert_eq!(frontier.tier_len(Priority::Low), 1);

        let order: Vec<String> = vec![
            frontier.dequeue().await.unwrap().url.path().to_string(),
            frontier.dequeue().await.unwrap().url.path().to_string(),
            frontier.dequeue().await.unwrap().url.path().to_string(),
        ];
        assert_eq!(order, ["/p/1234", "/category/shoes", "/about"]);
    }

    #[tokio::test]
    async fn test_fifo_within_tier() {
        let frontier = PriorityFrontier::new(100);
        for i in 0..5 {
            frontier.enqueue(task(&format!("https://shop.example/p/{}", i)));
        }
        for i in 0..5 {
            let next = frontier.dequeue().await.unwrap();
            assert_eq!(next.url.path(), format!("/p/{}", i));
        }
    }

    #[tokio::test]
    async fn test_duplicate_rejected_while_queued_or_in_flight() {
        let frontier = PriorityFrontier::new(100);
        assert_eq!(
            frontier.enqueue(task("https://shop.example/p/1")),
            EnqueueOutcome::Queued
        );
        assert_eq!(
            frontier.enqueue(task("https://shop.example/p/1")),
            EnqueueOutcome::Duplicate
        );

        let in_flight = frontier.dequeue().await.unwrap();
        assert_eq!(
            frontier.enqueue(task("https://shop.example/p/1")),
            EnqueueOutcome::Duplicate
        );
        assert_eq!(frontier.in_flight(), 1);

        // Keep the frontier open past the completion
        frontier.enqueue(task("https://shop.example/about"));
        frontier.complete(&in_flight);
        assert_eq!(
            frontier.enqueue(task("https://shop.example/p/1")),
            EnqueueOutcome::Queued
        );
    }

    #[test]
    fn test_full_frontier_evicts_lower_tier() {
        let frontier = PriorityFrontier::new(2);
        frontier.enqueue(task("https://shop.example/about"));
        frontier.enqueue(task("https://shop.example/contact-us"));

        assert_eq!(
            frontier.enqueue(task("https://shop.example/p/1")),
            EnqueueOutcome::Queued
        );
        assert_eq!(frontier.tier_len(Priority::Low), 1);
        assert_eq!(frontier.tier_len(Priority::High), 1);

        // Another HIGH task pushes out the remaining LOW task
        assert_eq!(frontier.dropped(), 1);
        frontier.enqueue(task("https://shop.example/p/2"));
        assert_eq!(frontier.tier_len(Priority::Low), 0);
    }

    #[test]
    fn test_full_frontier_drops_same_tier() {
        let frontier = PriorityFrontier::new(1);
        frontier.enqueue(task("https://shop.example/about"));

        assert_eq!(
            frontier.enqueue(task("https://shop.example/contact-us")),
            EnqueueOutcome::Dropped
        );
        assert_eq!(frontier.len(), 1);
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_enqueue() {
        let frontier = Arc::new(PriorityFrontier::new(10));

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.dequeue().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        frontier.enqueue(task("https://shop.example/p/9"));
        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.unwrap().url.path(), "/p/9");
    }

    #[tokio::test]
    async fn test_close_wakes_all_waiters() {
        let frontier = Arc::new(PriorityFrontier::new(10));

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                tokio::spawn(async move { frontier.dequeue().await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(20)).await;

        frontier.close();
        for waiter in waiters {
            let got = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
            assert!(got.is_none());
        }
        assert_eq!(
            frontier.enqueue(task("https://shop.example/p/1")),
            EnqueueOutcome::Closed
        );
    }

    #[tokio::test]
    async fn test_close_drains_remaining_tasks() {
        let frontier = PriorityFrontier::new(10);
        frontier.enqueue(task("https://shop.example/p/1"));
        frontier.close();

        assert!(frontier.dequeue().await.is_some());
        assert!(frontier.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_quiescence_closes_frontier() {
        let frontier = PriorityFrontier::new(10);
        frontier.enqueue(task("https://shop.example/"));

        let seed = frontier.dequeue().await.unwrap();
        frontier.enqueue(task("https://shop.example/p/1"));
        frontier.complete(&seed);
        assert!(!frontier.is_closed());

        let child = frontier.dequeue().await.unwrap();
        frontier.complete(&child);
        assert!(frontier.is_closed());
        assert!(frontier.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_requeue_keeps_reservation() {
        let frontier = PriorityFrontier::new(10);
        frontier.enqueue(task("https://shop.example/p/1"));

        let taken = frontier.dequeue().await.unwrap();
        assert!(frontier.requeue(taken.into_retry()));
        assert_eq!(frontier.in_flight(), 0);
        assert_eq!(
            frontier.enqueue(task("https://shop.example/p/1")),
            EnqueueOutcome::Duplicate
        );

        let again = frontier.dequeue().await.unwrap();
        assert_eq!(again.retry_count, 1);
    }

    #[tokio::test]
    async fn test_cancel_discards_queued_tasks() {
        let frontier = PriorityFrontier::new(10);
        frontier.enqueue(task("https://shop.example/p/1"));
        frontier.enqueue(task("https://shop.example/about"));

        assert_eq!(frontier.cancel(), 2);
        assert!(frontier.dequeue().await.is_none());
    }
}
