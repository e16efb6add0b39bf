//! Hybrid HTTP / browser fetcher
//!
//! This module handles all page fetches for the crawler, including:
//! - Building the HTTP client with the crawler's user agent
//! - Choosing between a plain HTTP fetch and a browser render per URL
//! - Escalating thin HTTP responses to the browser, cached per domain
//! - Retry with exponential backoff and jitter for transient failures
//! - Error classification (transient, permanent, render)

use super::backoff::BackoffPolicy;
use super::parser::{parse_html, ParsedPage};
use crate::browser::{BrowserPool, RenderError};
use crate::config::{FetchConfig, UserAgentConfig};
use crate::state::UrlTask;
use reqwest::{header, redirect::Policy, Client, StatusCode};
use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use url::Url;

/// URL path fragments of script-rendered storefronts
const SCRIPT_RENDERED_HINTS: &[&str] = &["/react/", "/vue/", "/angular/", "single-page-app"];

/// Rendered DOMs smaller than this must at least contain <html> or <body>
const MIN_RENDERED_BYTES: usize = 2048;

/// How a page was fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Plain HTTP GET
    Static,
    /// Browser render through the pool
    Dynamic,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal status of a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlStatus {
    Ok,
    HttpError,
    Timeout,
    RenderError,
}

impl CrawlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::HttpError => "http_error",
            Self::Timeout => "timeout",
            Self::RenderError => "render_error",
        }
    }
}

/// Failure class, which decides whether a retry can help
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Timeouts, connection errors, 5xx and 429
    Transient,
    /// Malformed URLs, unsupported schemes, 4xx other than 429, DNS failures
    Permanent,
    /// Browser crashes, navigation failures, incomplete renders
    Render,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::Render => "render",
        }
    }
}

/// Why a fetch attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub status: CrawlStatus,
    pub http_status: Option<u16>,
    pub reason: String,
    pub retryable: bool,
}

impl FetchFailure {
    fn transient(status: CrawlStatus, http_status: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            status,
            http_status,
            reason: reason.into(),
            retryable: true,
        }
    }

    fn permanent(http_status: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Permanent,
            status: CrawlStatus::HttpError,
            http_status,
            reason: reason.into(),
            retryable: false,
        }
    }

    fn render(error: &RenderError) -> Self {
        Self {
            kind: FailureKind::Render,
            status: CrawlStatus::RenderError,
            http_status: None,
            reason: error.to_string(),
            retryable: error.is_retryable(),
        }
    }

    /// Classifies an HTTP status code that is not a success
    fn from_status(status: StatusCode) -> Self {
        let code = Some(status.as_u16());
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Self::transient(CrawlStatus::HttpError, code, format!("HTTP {}", status))
        } else {
            Self::permanent(code, format!("HTTP {}", status))
        }
    }

    /// Classifies a reqwest error
    fn from_request_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::transient(CrawlStatus::Timeout, None, "request timed out");
        }
        if is_dns_failure(error) {
            return Self::permanent(None, format!("DNS resolution failed: {}", error));
        }
        if error.is_builder() {
            return Self::permanent(None, format!("invalid request: {}", error));
        }
        Self::transient(CrawlStatus::HttpError, None, error.to_string())
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Returns true if anything in the error's source chain is a name-resolution failure
fn is_dns_failure(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = source {
        let message = err.to_string().to_lowercase();
        if message.contains("dns error")
            || message.contains("failed to lookup address")
            || message.contains("name or service not known")
        {
            return true;
        }
        source = err.source();
    }
    false
}

/// Outcome of fetching one task
///
/// Produced by [`HybridFetcher::fetch`] and consumed right away by the
/// orchestrator's content analysis.
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// URL that was fetched
    pub url: Url,

    /// Terminal status
    pub status: CrawlStatus,

    /// Raw page content (empty on failure)
    pub content: String,

    /// Analysis of the content, present when the fetch succeeded
    pub page: Option<ParsedPage>,

    /// Strategy of the last attempt
    pub strategy: Strategy,

    /// Duration of the last attempt only
    pub elapsed: Duration,

    /// HTTP status of the last static attempt, if one got a response
    pub http_status: Option<u16>,

    /// Number of attempts made
    pub attempts: u32,

    /// Why the fetch failed, when it did
    pub failure: Option<FetchFailure>,
}

impl CrawlResult {
    pub fn is_ok(&self) -> bool {
        self.status == CrawlStatus::Ok
    }

    /// Returns true if the failure may clear up on a later try
    pub fn is_retryable(&self) -> bool {
        self.failure.as_ref().map(|f| f.retryable).unwrap_or(false)
    }
}

/// Retry and escalation settings, taken from the fetch configuration
#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
    pub thin_content_min_links: usize,
    pub thin_content_min_text: usize,
    /// Upper bound on one browser render
    pub render_timeout: Duration,
}

impl FetchSettings {
    pub fn from_config(config: &FetchConfig, render_timeout: Duration) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: BackoffPolicy::new(
                Duration::from_millis(config.backoff_base_ms),
                Duration::from_millis(config.backoff_ceiling_ms),
                config.jitter_ratio,
            ),
            thin_content_min_links: config.thin_content_min_links,
            thin_content_min_text: config.thin_content_min_text,
            render_timeout,
        }
    }
}

/// Successful attempt
struct Fetched {
    content: String,
    http_status: Option<u16>,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total request timeout
///
/// # Example
///
/// ```no_run
/// use product_scout::config::UserAgentConfig;
/// use product_scout::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "ProductScout".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://shop.example/about".to_string(),
///     contact_email: "admin@shop.example".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages over HTTP or through a browser, with retries
///
/// Every URL starts on the cheap HTTP path unless its domain is already known
/// to need rendering or the URL looks script-rendered. A thin HTTP response is
/// retried in the browser; if that render succeeds the domain is flagged and
/// later URLs on it skip the HTTP attempt.
pub struct HybridFetcher {
    client: Client,
    pool: Option<BrowserPool>,
    settings: FetchSettings,
    dynamic_domains: Mutex<HashSet<String>>,
}

impl HybridFetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client for the static path
    /// * `pool` - Browser pool for the dynamic path; None disables rendering
    /// * `settings` - Retry and escalation settings
    pub fn new(client: Client, pool: Option<BrowserPool>, settings: FetchSettings) -> Self {
        Self {
            client,
            pool,
            settings,
            dynamic_domains: Mutex::new(HashSet::new()),
        }
    }

    /// Returns true if the domain has been flagged as needing a browser
    pub fn is_dynamic_domain(&self, domain: &str) -> bool {
        self.dynamic_domains
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(domain)
    }

    fn mark_dynamic(&self, domain: &str) {
        let newly = self
            .dynamic_domains
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(domain.to_string());
        if newly {
            tracing::info!("Domain {} needs rendering, switching to browser", domain);
        }
    }

    /// Picks the first strategy for a URL
    pub fn select_strategy(&self, url: &Url, domain: &str) -> Strategy {
        if self.pool.is_none() {
            return Strategy::Static;
        }

        let lowered = url.as_str().to_lowercase();
        if self.is_dynamic_domain(domain) || SCRIPT_RENDERED_HINTS.iter().any(|h| lowered.contains(h))
        {
            Strategy::Dynamic
        } else {
            Strategy::Static
        }
    }

    /// Fetches a task's URL
    ///
    /// Makes at most `max_retries + 1` attempts, backing off between attempts
    /// that failed retryably. Non-retryable failures return at once. The
    /// escalation from a thin HTTP page to a render is not counted as a retry.
    pub async fn fetch(&self, task: &UrlTask) -> CrawlResult {
        let url = &task.url;
        let mut strategy = self.select_strategy(url, &task.domain);
        let mut escalated_from: Option<(Fetched, ParsedPage, Duration)> = None;
        let mut attempt: u32 = 0;

        loop {
            let started = Instant::now();
            let outcome = match strategy {
                Strategy::Static => self.fetch_static(url).await,
                Strategy::Dynamic => self.fetch_rendered(url).await,
            };
            let elapsed = started.elapsed();

            match outcome {
                Ok(fetched) => {
                    let page = parse_html(&fetched.content, url);

                    if strategy == Strategy::Static
                        && self.pool.is_some()
                        && page.is_thin(
                            self.settings.thin_content_min_links,
                            self.settings.thin_content_min_text,
                        )
                    {
                        tracing::debug!("Thin response for {}, escalating to browser", url);
                        escalated_from = Some((fetched, page, elapsed));
                        strategy = Strategy::Dynamic;
                        continue;
                    }

                    if escalated_from.is_some() {
                        self.mark_dynamic(&task.domain);
                    }

                    return success(url, fetched, page, strategy, elapsed, attempt + 1);
                }
                Err(failure) => {
                    if !failure.retryable || attempt >= self.settings.max_retries {
                        if let Some((fetched, page, static_elapsed)) = escalated_from {
                            tracing::warn!(
                                "Render of {} failed ({}), keeping the HTTP response",
                                url,
                                failure
                            );
                            return success(
                                url,
                                fetched,
                                page,
                                Strategy::Static,
                                static_elapsed,
                                attempt + 1,
                            );
                        }

                        tracing::debug!(
                            "Fetch of {} failed after {} attempt(s): {}",
                            url,
                            attempt + 1,
                            failure
                        );
                        return CrawlResult {
                            url: url.clone(),
                            status: failure.status,
                            content: String::new(),
                            page: None,
                            strategy,
                            elapsed,
                            http_status: failure.http_status,
                            attempts: attempt + 1,
                            failure: Some(failure),
                        };
                    }

                    let delay = self.settings.backoff.delay(attempt);
                    tracing::warn!(
                        "Attempt {} for {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        url,
                        failure,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn fetch_static(&self, url: &Url) -> Result<Fetched, FetchFailure> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| FetchFailure::from_request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::from_status(status));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_lowercase();
        if !content_type.contains("html") {
            return Err(FetchFailure::permanent(
                Some(status.as_u16()),
                format!("unsupported content type: {}", content_type),
            ));
        }

        let content = response
            .text()
            .await
            .map_err(|e| FetchFailure::from_request_error(&e))?;

        Ok(Fetched {
            content,
            http_status: Some(status.as_u16()),
        })
    }

    async fn fetch_rendered(&self, url: &Url) -> Result<Fetched, FetchFailure> {
        let Some(pool) = &self.pool else {
            return Err(FetchFailure::render(&RenderError::PoolClosed));
        };

        let mut lease = pool.acquire().await.map_err(|e| FetchFailure::render(&e))?;

        let rendered =
            match tokio::time::timeout(self.settings.render_timeout, lease.render(url)).await {
                Ok(Ok(html)) => validate_rendered(html),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(RenderError::Timeout(self.settings.render_timeout)),
            };

        match rendered {
            Ok(content) => {
                pool.release(lease, true).await;
                Ok(Fetched {
                    content,
                    http_status: None,
                })
            }
            Err(e) => {
                pool.release(lease, false).await;
                Err(FetchFailure::render(&e))
            }
        }
    }
}

/// Rejects rendered DOMs that are too small to be a loaded page
fn validate_rendered(html: String) -> Result<String, RenderError> {
    let lowered = html.to_lowercase();
    if html.len() < MIN_RENDERED_BYTES && !lowered.contains("<body") && !lowered.contains("<html")
    {
        return Err(RenderError::Incomplete(html.len()));
    }
    Ok(html)
}

fn success(
    url: &Url,
    fetched: Fetched,
    page: ParsedPage,
    strategy: Strategy,
    elapsed: Duration,
    attempts: u32,
) -> CrawlResult {
    CrawlResult {
        url: url.clone(),
        status: CrawlStatus::Ok,
        content: fetched.content,
        page: Some(page),
        strategy,
        elapsed,
        http_status: fetched.http_status,
        attempts,
        failure: None,
    }
}
