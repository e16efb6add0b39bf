//! Batched writes to the product store
//!
//! Records accumulate in a buffer that a dedicated writer task drains when it
//! reaches the batch size or when the flush interval elapses. The buffer is
//! bounded: once it holds `capacity` records (including records being
//! written), appends wait for a write to finish. Workers only ever wait on
//! buffer space, never on the store itself.

use super::backoff::BackoffPolicy;
use super::metrics::CrawlerMetrics;
use crate::config::StorageConfig;
use crate::storage::{ProductRecord, ProductStore, StorageError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Attempts per batch before its records are given up
const WRITE_ATTEMPTS: u32 = 3;

/// Buffers records and writes them to the store in batches
pub struct ProductBatcher {
    store: Arc<dyn ProductStore>,
    buffer: Mutex<Vec<ProductRecord>>,
    space: Semaphore,
    batch_ready: Notify,
    batch_size: usize,
    flush_interval: Duration,
    retry: BackoffPolicy,
    metrics: Arc<CrawlerMetrics>,
}

impl ProductBatcher {
    /// Creates a batcher from the storage settings
    pub fn new(
        store: Arc<dyn ProductStore>,
        config: &StorageConfig,
        metrics: Arc<CrawlerMetrics>,
    ) -> Self {
        let batch_size = config.batch_size.max(1);
        let capacity = config.buffer_capacity.max(batch_size);

        Self {
            store,
            buffer: Mutex::new(Vec::with_capacity(batch_size)),
            space: Semaphore::new(capacity),
            batch_ready: Notify::new(),
            batch_size,
            flush_interval: Duration::from_millis(config.flush_interval_ms.max(1)),
            retry: BackoffPolicy::new(Duration::from_millis(50), Duration::from_secs(2), 0.2),
            metrics,
        }
    }

    /// Overrides the delay schedule between write attempts
    pub fn with_retry_policy(mut self, retry: BackoffPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Appends a record, waking the writer once a full batch is buffered
    ///
    /// Waits only while the buffer is at capacity.
    pub async fn push(&self, record: ProductRecord) {
        match self.space.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => return,
        }

        let full = {
            let mut buffer = self.lock();
            buffer.push(record);
            buffer.len() >= self.batch_size
        };

        if full {
            self.batch_ready.notify_one();
        }
    }

    /// Writes everything currently buffered, one batch at a time
    pub async fn flush(&self) {
        let pending = std::mem::take(&mut *self.lock());
        let mut records = pending.into_iter().peekable();

        while records.peek().is_some() {
            let batch: Vec<ProductRecord> = records.by_ref().take(self.batch_size).collect();
            self.write(batch).await;
        }
    }

    /// Number of records waiting in the buffer
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Spawns the writer task, which flushes on every full batch and every
    /// interval until `stop` fires
    ///
    /// A flush already under way when `stop` fires runs to completion.
    pub fn spawn_writer(self: &Arc<Self>, stop: CancellationToken) -> JoinHandle<()> {
        let batcher = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(batcher.flush_interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticks.tick().await;

            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = batcher.batch_ready.notified() => {}
                    _ = ticks.tick() => {}
                }
                batcher.flush().await;
            }
        })
    }

    async fn write(&self, batch: Vec<ProductRecord>) {
        let count = batch.len();
        let batch = Arc::new(batch);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.try_write(Arc::clone(&batch)).await {
                Ok(written) => {
                    self.metrics.record_flush();
                    tracing::debug!("Flushed {} record(s) to storage", written);
                    break;
                }
                Err(e) if attempt < WRITE_ATTEMPTS => {
                    let delay = self.retry.delay(attempt - 1);
                    tracing::warn!(
                        "Write of {} record(s) failed (attempt {}/{}), retrying in {:?}: {}",
                        count,
                        attempt,
                        WRITE_ATTEMPTS,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.metrics.record_storage_error();
                    tracing::error!(
                        "Dropping batch of {} record(s) after {} attempts: {}",
                        count,
                        attempt,
                        e
                    );
                    break;
                }
            }
        }

        self.space.add_permits(count);
    }

    async fn try_write(&self, batch: Arc<Vec<ProductRecord>>) -> Result<usize, StorageError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.bulk_upsert_product_urls(&batch))
            .await
            .map_err(|e| StorageError::Database(format!("storage task failed: {}", e)))?
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ProductRecord>> {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner())
    }
}
