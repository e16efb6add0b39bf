use serde::Deserialize;

/// Main configuration structure for Product-Scout
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub storage: StorageConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Crawl loop configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Number of concurrent workers per crawl run
    pub workers: usize,

    /// Maximum link depth to expand from a seed
    pub max_depth: u32,

    /// Maximum number of queued tasks before LOW tier work is shed
    pub frontier_capacity: usize,

    /// Scheduling-level requeues allowed per task, independent of fetch retries
    pub max_task_retries: u32,

    /// Only follow links on the host of the page they were found on
    pub stay_on_domain: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            max_depth: 5,
            frontier_capacity: 100_000,
            max_task_retries: 2,
            stay_on_domain: true,
        }
    }
}

/// Per-domain dispatch spacing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RateLimitConfig {
    /// Minimum time between two dispatches to the same domain (milliseconds)
    pub default_delay_ms: u64,

    /// Factor applied to the delay for each consecutive retryable failure
    pub backoff_multiplier: f64,

    /// Ceiling for the backed-off delay (milliseconds)
    pub max_delay_ms: u64,

    /// Per-domain delay overrides
    #[serde(rename = "override")]
    pub overrides: Vec<DelayOverride>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 60_000,
            overrides: Vec::new(),
        }
    }
}

/// Delay override for one domain pattern (e.g., "shop.example" or "*.shop.example")
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DelayOverride {
    pub domain: String,
    pub delay_ms: u64,
}

/// Visited-URL tracker sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DedupConfig {
    /// Number of URLs the probabilistic filter is sized for
    pub expected_urls: usize,

    /// Target false-positive rate of the filter (e.g., 0.001)
    pub false_positive_rate: f64,

    /// Size of the exact recently-seen set
    pub recent_capacity: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            expected_urls: 1_000_000,
            false_positive_rate: 0.001,
            recent_capacity: 50_000,
        }
    }
}

/// Browser pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BrowserConfig {
    /// Maximum number of concurrently open browser sessions
    pub max_sessions: usize,

    /// WebDriver endpoint sessions are launched against
    pub webdriver_url: String,

    /// Run the browser without a visible window
    pub headless: bool,

    /// Navigation timeout per render (seconds)
    pub page_load_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            max_sessions: 4,
            webdriver_url: "http://localhost:4444".to_string(),
            headless: true,
            page_load_timeout_secs: 30,
        }
    }
}

/// Fetch retry and strategy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FetchConfig {
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,

    /// Base delay of the exponential backoff (milliseconds)
    pub backoff_base_ms: u64,

    /// Maximum backoff delay (milliseconds)
    pub backoff_ceiling_ms: u64,

    /// Jitter added on top of the backoff, as a fraction of the delay (0.0..=0.5)
    pub jitter_ratio: f64,

    /// HTTP request timeout (seconds)
    pub request_timeout_secs: u64,

    /// A static page with fewer links than this may be thin
    pub thin_content_min_links: usize,

    /// A static page with less visible text than this may be thin
    pub thin_content_min_text: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 500,
            backoff_ceiling_ms: 30_000,
            jitter_ratio: 0.25,
            request_timeout_secs: 30,
            thin_content_min_links: 3,
            thin_content_min_text: 200,
        }
    }
}

/// Product storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Flush the batch once it holds this many records
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Flush a non-empty batch at least this often (milliseconds)
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    /// Records the batch buffer may hold before appends block
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
}

fn default_batch_size() -> usize {
    10
}

fn default_flush_interval_ms() -> u64 {
    5_000
}

fn default_buffer_capacity() -> usize {
    1_000
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}
