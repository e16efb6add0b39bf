//! Database schema definitions
//!
//! This module contains the SQL schema for the Product-Scout database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per discovered product (or permanently failed) URL
CREATE TABLE IF NOT EXISTS product_urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    domain TEXT NOT NULL,
    status TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}',
    discovered_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(url, domain)
);

CREATE INDEX IF NOT EXISTS idx_product_urls_domain ON product_urls(domain);
CREATE INDEX IF NOT EXISTS idx_product_urls_status ON product_urls(status);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
