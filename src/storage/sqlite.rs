//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ProductStore trait.

use crate::state::RecordStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ProductStore, StorageResult};
use crate::storage::ProductRecord;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Upsert keyed on (url, domain). A confirmed product is never downgraded to
/// failed by a later record.
const UPSERT_SQL: &str = "
    INSERT INTO product_urls (url, domain, status, metadata, discovered_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(url, domain) DO UPDATE SET
        status = CASE
            WHEN product_urls.status = 'product' THEN product_urls.status
            ELSE excluded.status
        END,
        metadata = CASE
            WHEN product_urls.status = 'product' AND excluded.status != 'product'
                THEN product_urls.metadata
            ELSE excluded.metadata
        END,
        updated_at = excluded.updated_at
";

/// SQLite storage backend
pub struct SqliteProductStore {
    conn: Mutex<Connection>,
}

impl SqliteProductStore {
    /// Creates a new SqliteProductStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteProductStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProductStore for SqliteProductStore {
    fn bulk_upsert_product_urls(&self, batch: &[ProductRecord]) -> StorageResult<usize> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        {
            let mut stmt = tx.prepare_cached(UPSERT_SQL)?;
            for record in batch {
                stmt.execute(params![
                    record.url,
                    record.domain,
                    record.status.to_db_string(),
                    record.metadata.to_string(),
                    record.discovered_at.to_rfc3339(),
                    now,
                ])?;
            }
        }

        tx.commit()?;
        Ok(batch.len())
    }

    fn count_by_status(&self, status: RecordStatus) -> StorageResult<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM product_urls WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn urls_by_status(&self, status: RecordStatus) -> StorageResult<Vec<String>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT url FROM product_urls WHERE status = ?1 ORDER BY url")?;

        let urls = stmt
            .query_map(params![status.to_db_string()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(urls)
    }

    fn count_domains(&self) -> StorageResult<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(DISTINCT domain) FROM product_urls",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product(url: &str) -> ProductRecord {
        ProductRecord::new(
            url,
            "shop.example",
            RecordStatus::Product,
            json!({"title": "Red shoe"}),
        )
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteProductStore::new_in_memory().is_ok());
    }

    #[test]
    fn test_bulk_upsert() {
        let store = SqliteProductStore::new_in_memory().unwrap();
        let batch = vec![
            product("https://shop.example/p/1"),
            product("https://shop.example/p/2"),
        ];

        assert_eq!(store.bulk_upsert_product_urls(&batch).unwrap(), 2);
        assert_eq!(store.count_by_status(RecordStatus::Product).unwrap(), 2);
        assert_eq!(store.count_domains().unwrap(), 1);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let store = SqliteProductStore::new_in_memory().unwrap();
        let batch = vec![product("https://shop.example/p/1")];

        store.bulk_upsert_product_urls(&batch).unwrap();
        store.bulk_upsert_product_urls(&batch).unwrap();

        assert_eq!(store.count_by_status(RecordStatus::Product).unwrap(), 1);
        assert_eq!(
            store.urls_by_status(RecordStatus::Product).unwrap(),
            vec!["https://shop.example/p/1".to_string()]
        );
    }

    #[test]
    fn test_product_is_not_downgraded() {
        let store = SqliteProductStore::new_in_memory().unwrap();
        store
            .bulk_upsert_product_urls(&[product("https://shop.example/p/1")])
            .unwrap();

        let failed = ProductRecord::new(
            "https://shop.example/p/1",
            "shop.example",
            RecordStatus::Failed,
            json!({"reason": "HTTP 500"}),
        );
        store.bulk_upsert_product_urls(&[failed]).unwrap();

        assert_eq!(store.count_by_status(RecordStatus::Product).unwrap(), 1);
        assert_eq!(store.count_by_status(RecordStatus::Failed).unwrap(), 0);
    }

    #[test]
    fn test_failed_upgraded_to_product() {
        let store = SqliteProductStore::new_in_memory().unwrap();
        let failed = ProductRecord::new(
            "https://shop.example/p/1",
            "shop.example",
            RecordStatus::Failed,
            json!({"reason": "HTTP 503"}),
        );
        store.bulk_upsert_product_urls(&[failed]).unwrap();
        store
            .bulk_upsert_product_urls(&[product("https://shop.example/p/1")])
            .unwrap();

        assert_eq!(store.count_by_status(RecordStatus::Product).unwrap(), 1);
        assert_eq!(store.count_by_status(RecordStatus::Failed).unwrap(), 0);
    }

    #[test]
    fn test_same_url_different_domain_kept_apart() {
        let store = SqliteProductStore::new_in_memory().unwrap();
        let mut other = product("https://shop.example/p/1");
        other.domain = "mirror.example".to_string();

        store
            .bulk_upsert_product_urls(&[product("https://shop.example/p/1"), other])
            .unwrap();
        assert_eq!(store.count_by_status(RecordStatus::Product).unwrap(), 2);
    }

    #[test]
    fn test_empty_batch() {
        let store = SqliteProductStore::new_in_memory().unwrap();
        assert_eq!(store.bulk_upsert_product_urls(&[]).unwrap(), 0);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.db");

        {
            let store = SqliteProductStore::new(&path).unwrap();
            store
                .bulk_upsert_product_urls(&[product("https://shop.example/p/1")])
                .unwrap();
        }

        let reopened = SqliteProductStore::new(&path).unwrap();
        assert_eq!(reopened.count_by_status(RecordStatus::Product).unwrap(), 1);
    }
}
