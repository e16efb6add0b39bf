//! Crawler module for product-page discovery
//!
//! This module contains the core crawling logic, including:
//! - The strict-priority frontier and per-domain rate limiting
//! - HTTP and browser fetching with retry and backoff
//! - HTML analysis, product confirmation and link extraction
//! - Batched writes to the product store
//! - Overall crawl orchestration and metrics

mod backoff;
mod batch;
mod coordinator;
mod fetcher;
mod frontier;
mod metrics;
mod parser;
mod rate_limiter;

pub use backoff::{backoff_delay, BackoffPolicy};
pub use batch::ProductBatcher;
pub use coordinator::{CrawlHandle, HealthStatus, WebScraper};
pub use fetcher::{
    build_http_client, CrawlResult, CrawlStatus, FailureKind, FetchFailure, FetchSettings,
    HybridFetcher, Strategy,
};
pub use frontier::{EnqueueOutcome, PriorityFrontier};
pub use metrics::{CrawlerMetrics, MetricsSnapshot};
pub use parser::{parse_html, ParsedPage};
pub use rate_limiter::DomainRateLimiter;
