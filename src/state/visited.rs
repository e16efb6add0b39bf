use super::bloom::BloomFilter;
use crate::config::DedupConfig;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Deduplication gate for discovered URLs
///
/// Combines a bloom filter sized for the whole run with a bounded exact set of
/// recently seen URLs. Both layers sit behind one lock, so `check_and_mark` is
/// a single atomic step for concurrent callers.
#[derive(Debug)]
pub struct VisitedUrlTracker {
    inner: Mutex<TrackerInner>,
}

#[derive(Debug)]
struct TrackerInner {
    filter: BloomFilter,
    recent: HashSet<String>,
    order: VecDeque<String>,
    recent_capacity: usize,
    marked: u64,
}

impl VisitedUrlTracker {
    /// Creates a tracker from the dedup settings
    pub fn new(config: &DedupConfig) -> Self {
        Self::with_capacity(
            config.expected_urls,
            config.false_positive_rate,
            config.recent_capacity,
        )
    }

    /// Creates a tracker with explicit sizing
    ///
    /// # Arguments
    ///
    /// * `expected_urls` - Number of distinct URLs the filter is sized for
    /// * `false_positive_rate` - Target false-positive rate of the filter
    /// * `recent_capacity` - Size of the exact recent-URL set
    pub fn with_capacity(
        expected_urls: usize,
        false_positive_rate: f64,
        recent_capacity: usize,
    ) -> Self {
        let recent_capacity = recent_capacity.max(1);
        Self {
            inner: Mutex::new(TrackerInner {
                filter: BloomFilter::with_rate(expected_urls, false_positive_rate),
                recent: HashSet::with_capacity(recent_capacity.min(65_536)),
                order: VecDeque::with_capacity(recent_capacity.min(65_536)),
                recent_capacity,
                marked: 0,
            }),
        }
    }

    /// Records a URL as seen
    ///
    /// Returns true exactly once per URL: the first time it is observed. Later
    /// calls return false. A bloom false positive also returns false and the URL
    /// is dropped.
    pub fn check_and_mark(&self, url: &str) -> bool {
        let mut inner = self.lock();

        if inner.recent.contains(url) {
            return false;
        }
        if !inner.filter.insert(url) {
            return false;
        }

        inner.remember(url);
        inner.marked += 1;
        true
    }

    /// Returns true if the URL has (probably) been seen, without marking it
    pub fn contains(&self, url: &str) -> bool {
        let inner = self.lock();
        inner.recent.contains(url) || inner.filter.contains(url)
    }

    /// Number of URLs accepted by `check_and_mark`
    pub fn len(&self) -> u64 {
        self.lock().marked
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TrackerInner {
    fn remember(&mut self, url: &str) {
        if self.order.len() >= self.recent_capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.recent.remove(&evicted);
            }
        }
        self.recent.insert(url.to_string());
        self.order.push_back(url.to_string());
    }
}
