//! URL handling module for Product-Scout
//!
//! This module provides URL normalization, seed parsing, domain extraction,
//! wildcard matching for rate-limit overrides, and the URL classification rules
//! that drive frontier priority and product detection.

mod classify;
mod domain;
mod matcher;
mod normalize;

pub use classify::{classify_priority, is_product_url, should_follow};
pub use domain::{extract_domain, same_host};
pub use matcher::matches_wildcard;
pub use normalize::{normalize_url, parse_seed};
