//! Storage module for persisting discovered product URLs
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Idempotent bulk upserts of product and failed-URL records
//! - Count queries for run statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteProductStore;
pub use traits::{ProductStore, StorageError, StorageResult};

use crate::state::RecordStatus;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::Path;

/// Opens (or creates) a product store database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_storage(path: &Path) -> StorageResult<SqliteProductStore> {
    SqliteProductStore::new(path)
}

/// A record handed to the product store
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub url: String,
    pub domain: String,
    pub discovered_at: DateTime<Utc>,
    pub status: RecordStatus,
    /// Free-form JSON details (title, strategy, failure reason)
    pub metadata: Value,
}

impl ProductRecord {
    /// Creates a record discovered now
    pub fn new(
        url: impl Into<String>,
        domain: impl Into<String>,
        status: RecordStatus,
        metadata: Value,
    ) -> Self {
        Self {
            url: url.into(),
            domain: domain.into(),
            discovered_at: Utc::now(),
            status,
            metadata,
        }
    }
}
