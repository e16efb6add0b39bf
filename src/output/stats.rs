//! Statistics from the product store
//!
//! This module loads the stored record counts shown by `--stats` and
//! prints them.

use crate::state::RecordStatus;
use crate::storage::{ProductStore, StorageResult};

/// How many sample product URLs are listed
const SAMPLE_SIZE: usize = 10;

/// Stored record counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStatistics {
    /// Confirmed product pages
    pub products: u64,

    /// URLs recorded as failed
    pub failed: u64,

    /// Distinct domains with at least one record
    pub domains: u64,

    /// The first product URLs in URL order
    pub sample_products: Vec<String>,
}

impl StoreStatistics {
    pub fn total(&self) -> u64 {
        self.products + self.failed
    }
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The product store to query
pub fn load_statistics(store: &dyn ProductStore) -> StorageResult<StoreStatistics> {
    let mut sample_products = store.urls_by_status(RecordStatus::Product)?;
    sample_products.truncate(SAMPLE_SIZE);

    Ok(StoreStatistics {
        products: store.count_by_status(RecordStatus::Product)?,
        failed: store.count_by_status(RecordStatus::Failed)?,
        domains: store.count_domains()?,
        sample_products,
    })
}

/// Formats statistics for the terminal
pub fn format_statistics(stats: &StoreStatistics) -> String {
    let mut out = String::from("=== Stored Product URLs ===\n\n");

    out.push_str(&format!("  Product pages: {}\n", stats.products));
    out.push_str(&format!("  Failed URLs: {}\n", stats.failed));
    out.push_str(&format!("  Domains: {}\n", stats.domains));

    let product_share = if stats.total() > 0 {
        stats.products as f64 / stats.total() as f64 * 100.0
    } else {
        0.0
    };
    out.push_str(&format!("  Product share: {:.1}%\n", product_share));

    if !stats.sample_products.is_empty() {
        out.push_str(&format!("\nFirst {} product URL(s):\n", stats.sample_products.len()));
        for url in &stats.sample_products {
            out.push_str(&format!("  - {}\n", url));
        }
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &StoreStatistics) {
    print!("{}", format_statistics(stats));
}
