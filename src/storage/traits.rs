//! Storage traits and error types
//!
//! This module defines the contract the crawler writes product URLs through,
//! and the associated error types.

use crate::state::RecordStatus;
use crate::storage::ProductRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence contract for discovered product URLs
///
/// Implementations must be safe to share between worker tasks. Calls are
/// blocking; the crawler runs them on the blocking thread pool.
pub trait ProductStore: Send + Sync {
    /// Inserts or updates a batch of records
    ///
    /// Must be idempotent on (url, domain): delivering the same batch twice
    /// leaves the store as if it had been delivered once.
    ///
    /// # Returns
    ///
    /// The number of records written
    fn bulk_upsert_product_urls(&self, batch: &[ProductRecord]) -> StorageResult<usize>;

    /// Counts stored records with the given status
    fn count_by_status(&self, status: RecordStatus) -> StorageResult<u64>;

    /// Lists stored URLs with the given status, ordered by URL
    fn urls_by_status(&self, status: RecordStatus) -> StorageResult<Vec<String>>;

    /// Counts distinct domains with at least one record
    fn count_domains(&self) -> StorageResult<u64>;
}
