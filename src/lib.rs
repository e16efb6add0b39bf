//! Product-Scout: a product-page discovery crawler
//!
//! This crate crawls outward from seed domains, fetching pages either over plain
//! HTTP or through a pool of WebDriver browser sessions, and persists the URLs it
//! confirms as product-detail pages.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Product-Scout operations
///
/// Individual fetch failures never surface here; they are reported through
/// [`crawler::CrawlResult`] and the metrics. This type covers setup and
/// infrastructure failures only.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("No valid seed URLs in {0:?}")]
    NoSeeds(Vec<String>),

    #[error("Scraper has been shut down")]
    ShutDown,

    #[error("Crawl task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Product-Scout operations
pub type Result<T> = std::result::Result<T, CrawlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlHandle, MetricsSnapshot, WebScraper};
pub use state::{Priority, UrlTask};
pub use url::{classify_priority, extract_domain, normalize_url, parse_seed};
