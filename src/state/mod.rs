//! State module for tracking crawl progress
//!
//! This module provides the per-run state shared by crawl workers.
//!
//! # Components
//!
//! - `UrlTask` / `Priority`: A queued URL and its frontier tier
//! - `DomainState`: Per-domain dispatch spacing and error backoff
//! - `VisitedUrlTracker`: Bloom filter plus exact recent set for URL deduplication
//! - `RecordStatus`: Status of a record handed to the product store

mod bloom;
mod domain_state;
mod record_status;
mod task;
mod visited;

// Re-export main types
pub use bloom::BloomFilter;
pub use domain_state::DomainState;
pub use record_status::RecordStatus;
pub use task::{Priority, UrlTask};
pub use visited::VisitedUrlTracker;
