//! Output module for crawl reports
//!
//! This module handles:
//! - Summarizing a run's metrics for the terminal
//! - Reporting what the product store holds

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, StoreStatistics};

use crate::crawler::MetricsSnapshot;

/// Formats a run's metrics as a human-readable summary
pub fn format_run_summary(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::from("=== Crawl Summary ===\n\n");

    out.push_str(&format!("  Pages crawled: {}\n", snapshot.urls_crawled));
    out.push_str(&format!("  Product pages: {}\n", snapshot.product_urls));
    out.push_str(&format!("  Failed: {}\n", snapshot.requests_failed));
    out.push_str(&format!("  Error rate: {:.1}%\n", snapshot.error_rate * 100.0));
    out.push_str(&format!(
        "  Avg response time: {:.0} ms\n",
        snapshot.avg_response_time * 1000.0
    ));
    out.push_str(&format!("  Rendered in browser: {}\n", snapshot.rendered_pages));
    out.push_str(&format!("  Requeued: {}\n", snapshot.retries));
    out.push_str(&format!("  Batches written: {}\n", snapshot.batches_flushed));

    if snapshot.storage_errors > 0 {
        out.push_str(&format!(
            "\n  WARNING: {} batch(es) could not be written\n",
            snapshot.storage_errors
        ));
    }

    out
}

/// Prints a run's metrics summary to stdout
pub fn print_run_summary(snapshot: &MetricsSnapshot) {
    print!("{}", format_run_summary(snapshot));
}
