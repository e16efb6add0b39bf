//! Crawl counters
//!
//! All counters are atomics: workers update them on every task and readers take
//! a snapshot without ever blocking a writer. A run's metrics can forward every
//! update to a parent, which is how the service keeps totals across runs.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Running counters for one crawl run (or a whole service lifetime)
#[derive(Debug, Default)]
pub struct CrawlerMetrics {
    urls_crawled: AtomicU64,
    product_urls: AtomicU64,
    requests_failed: AtomicU64,
    retries: AtomicU64,
    rendered_pages: AtomicU64,
    batches_flushed: AtomicU64,
    storage_errors: AtomicU64,
    response_time_micros: AtomicU64,
    response_samples: AtomicU64,
    parent: Option<Arc<CrawlerMetrics>>,
}

/// Point-in-time view of [`CrawlerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Pages fetched successfully
    pub urls_crawled: u64,
    /// Confirmed product pages
    pub product_urls: u64,
    /// Mean latency of successful fetches, in seconds
    pub avg_response_time: f64,
    /// Failed tasks over finished tasks
    pub error_rate: f64,
    /// Tasks that ended in failure
    pub requests_failed: u64,
    /// Scheduling-level requeues
    pub retries: u64,
    /// Successful fetches that went through a browser
    pub rendered_pages: u64,
    /// Batches written to storage
    pub batches_flushed: u64,
    /// Batches storage rejected
    pub storage_errors: u64,
}

impl CrawlerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates metrics whose updates also land in `parent`
    pub fn with_parent(parent: &Arc<CrawlerMetrics>) -> Self {
        Self {
            parent: Some(Arc::clone(parent)),
            ..Self::default()
        }
    }

    fn apply<F: Fn(&CrawlerMetrics)>(&self, update: &F) {
        update(self);
        if let Some(parent) = &self.parent {
            parent.apply(update);
        }
    }

    /// Records a successful fetch and its latency
    ///
    /// Only the latency of the successful attempt should be passed in, so that
    /// retried failures do not skew the average.
    pub fn record_success(&self, elapsed: Duration, rendered: bool) {
        let micros = elapsed.as_micros() as u64;
        self.apply(&|m: &CrawlerMetrics| {
            m.urls_crawled.fetch_add(1, Ordering::Relaxed);
            m.response_time_micros.fetch_add(micros, Ordering::Relaxed);
            m.response_samples.fetch_add(1, Ordering::Relaxed);
            if rendered {
                m.rendered_pages.fetch_add(1, Ordering::Relaxed);
            }
        });
    }

    /// Records a task that ended in failure
    pub fn record_failure(&self) {
        self.apply(&|m: &CrawlerMetrics| {
            m.requests_failed.fetch_add(1, Ordering::Relaxed);
        });
    }

    pub fn record_product(&self) {
        self.apply(&|m: &CrawlerMetrics| {
            m.product_urls.fetch_add(1, Ordering::Relaxed);
        });
    }

    pub fn record_retry(&self) {
        self.apply(&|m: &CrawlerMetrics| {
            m.retries.fetch_add(1, Ordering::Relaxed);
        });
    }

    pub fn record_flush(&self) {
        self.apply(&|m: &CrawlerMetrics| {
            m.batches_flushed.fetch_add(1, Ordering::Relaxed);
        });
    }

    pub fn record_storage_error(&self) {
        self.apply(&|m: &CrawlerMetrics| {
            m.storage_errors.fetch_add(1, Ordering::Relaxed);
        });
    }

    /// Takes a snapshot of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        let urls_crawled = self.urls_crawled.load(Ordering::Relaxed);
        let requests_failed = self.requests_failed.load(Ordering::Relaxed);
        let samples = self.response_samples.load(Ordering::Relaxed);
        let micros = self.response_time_micros.load(Ordering::Relaxed);

        let avg_response_time = if samples > 0 {
            micros as f64 / samples as f64 / 1_000_000.0
        } else {
            0.0
        };

        let finished = urls_crawled + requests_failed;
        let error_rate = if finished > 0 {
            requests_failed as f64 / finished as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            urls_crawled,
            product_urls: self.product_urls.load(Ordering::Relaxed),
            avg_response_time,
            error_rate,
            requests_failed,
            retries: self.retries.load(Ordering::Relaxed),
            rendered_pages: self.rendered_pages.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            storage_errors: self.storage_errors.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// Renders the snapshot as pretty-printed JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
