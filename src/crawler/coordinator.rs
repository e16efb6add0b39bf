//! Crawl orchestration
//!
//! A [`WebScraper`] owns the long-lived pieces shared by every crawl run: the
//! HTTP client, the browser pool, the product store and the service-wide
//! metrics. Each call to [`WebScraper::start_crawl`] builds a fresh
//! [`CrawlContext`] holding the run's frontier, visited tracker, rate limiter
//! and batcher, and spawns the run's workers against it. The context is dropped
//! when the run reaches quiescence or is cancelled.

use super::batch::ProductBatcher;
use super::fetcher::{build_http_client, CrawlResult, FetchSettings, HybridFetcher, Strategy};
use super::frontier::{EnqueueOutcome, PriorityFrontier};
use super::metrics::{CrawlerMetrics, MetricsSnapshot};
use super::rate_limiter::DomainRateLimiter;
use crate::browser::{BrowserPool, SessionFactory, WebDriverFactory};
use crate::config::Config;
use crate::state::{Priority, RecordStatus, UrlTask, VisitedUrlTracker};
use crate::storage::{open_storage, ProductRecord, ProductStore};
use crate::url::{is_product_url, normalize_url, parse_seed, same_host, should_follow};
use crate::{CrawlError, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Extra time allowed on top of the WebDriver page-load timeout
const RENDER_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Service health as reported to the control surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    /// `ok`, or `shutting_down` once [`WebScraper::shutdown`] was called
    pub status: &'static str,

    /// Workers currently running across all crawl runs
    pub active_scrapers: usize,
}

/// The crawl service
///
/// Several crawl runs may be active at once; they share the HTTP client,
/// browser pool and store but nothing else.
pub struct WebScraper {
    config: Arc<Config>,
    client: Client,
    pool: Option<BrowserPool>,
    store: Arc<dyn ProductStore>,
    metrics: Arc<CrawlerMetrics>,
    active_workers: Arc<AtomicUsize>,
    runs_started: AtomicU64,
    shutdown: CancellationToken,
}

impl WebScraper {
    /// Creates a scraper
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `store` - Where product and failed-URL records are written
    /// * `sessions` - Browser session factory; None disables rendering
    pub fn new(
        config: Config,
        store: Arc<dyn ProductStore>,
        sessions: Option<Arc<dyn SessionFactory>>,
    ) -> Result<Self> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.fetch.request_timeout_secs),
        )?;
        let pool = sessions.map(|factory| BrowserPool::new(factory, config.browser.max_sessions));

        Ok(Self {
            config: Arc::new(config),
            client,
            pool,
            store,
            metrics: Arc::new(CrawlerMetrics::new()),
            active_workers: Arc::new(AtomicUsize::new(0)),
            runs_started: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        })
    }

    /// Creates a scraper backed by the configured SQLite database and WebDriver endpoint
    ///
    /// Browser sessions are launched lazily, so no WebDriver connection is made here.
    pub fn from_config(config: Config) -> Result<Self> {
        let store = open_storage(Path::new(&config.storage.database_path))?;
        let factory = WebDriverFactory::new(&config.browser, config.user_agent.header_value());

        Self::new(config, Arc::new(store), Some(Arc::new(factory)))
    }

    /// Starts a crawl run over the given domains
    ///
    /// Entries may be bare hosts (`shop.example/`) or full URLs. Invalid entries
    /// are skipped with a warning; if none is valid the call fails with
    /// [`CrawlError::NoSeeds`]. The run proceeds in the background until
    /// quiescence or cancellation.
    pub fn start_crawl<I, S>(&self, domains: I) -> Result<CrawlHandle>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.shutdown.is_cancelled() {
            return Err(CrawlError::ShutDown);
        }

        let inputs: Vec<String> = domains
            .into_iter()
            .map(|d| d.as_ref().to_string())
            .collect();

        let mut seeds = Vec::new();
        for input in &inputs {
            match parse_seed(input).and_then(|url| UrlTask::new(url, 0)) {
                Ok(task) => seeds.push(task),
                Err(e) => warn!("Skipping seed {:?}: {}", input, e),
            }
        }
        if seeds.is_empty() {
            return Err(CrawlError::NoSeeds(inputs));
        }

        let run_id = self.runs_started.fetch_add(1, Ordering::Relaxed) + 1;
        let ctx = Arc::new(self.new_context(run_id));

        let mut queued = 0;
        for task in seeds {
            if ctx.tracker.check_and_mark(task.as_str())
                && ctx.frontier.enqueue(task) == EnqueueOutcome::Queued
            {
                queued += 1;
            }
        }

        let workers = self.config.crawler.workers.max(1);
        info!(
            "Starting crawl run {} with {} seed(s) and {} worker(s)",
            run_id, queued, workers
        );

        let handle = CrawlHandle {
            cancel: ctx.cancel.clone(),
            metrics: Arc::clone(&ctx.metrics),
            run: tokio::spawn(supervise(ctx, workers, Arc::clone(&self.active_workers))),
        };

        Ok(handle)
    }

    fn new_context(&self, run_id: u64) -> CrawlContext {
        let config = &self.config;
        let metrics = Arc::new(CrawlerMetrics::with_parent(&self.metrics));
        let render_timeout =
            Duration::from_secs(config.browser.page_load_timeout_secs) + RENDER_TIMEOUT_MARGIN;

        CrawlContext {
            run_id,
            config: Arc::clone(config),
            frontier: PriorityFrontier::new(config.crawler.frontier_capacity),
            tracker: VisitedUrlTracker::new(&config.dedup),
            limiter: DomainRateLimiter::new(&config.rate_limit),
            fetcher: HybridFetcher::new(
                self.client.clone(),
                self.pool.clone(),
                FetchSettings::from_config(&config.fetch, render_timeout),
            ),
            batcher: Arc::new(ProductBatcher::new(
                Arc::clone(&self.store),
                &config.storage,
                Arc::clone(&metrics),
            )),
            metrics,
            cancel: self.shutdown.child_token(),
        }
    }

    /// Totals across every crawl run since the scraper was created
    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: if self.shutdown.is_cancelled() {
                "shutting_down"
            } else {
                "ok"
            },
            active_scrapers: self.active_workers.load(Ordering::Relaxed),
        }
    }

    /// Waits for a run, then shuts the scraper down
    ///
    /// Shutdown happens even when the run itself failed, so leased browser
    /// sessions are always closed.
    pub async fn finish(&self, handle: CrawlHandle) -> Result<MetricsSnapshot> {
        let outcome = handle.wait().await;
        self.shutdown().await;
        outcome
    }

    /// Cancels all active runs, refuses new ones and closes the browser pool
    pub async fn shutdown(&self) {
        info!("Shutting down scraper");
        self.shutdown.cancel();
        if let Some(pool) = &self.pool {
            pool.shutdown().await;
        }
    }
}

/// Handle to a running crawl
pub struct CrawlHandle {
    cancel: CancellationToken,
    metrics: Arc<CrawlerMetrics>,
    run: JoinHandle<MetricsSnapshot>,
}

impl CrawlHandle {
    /// Stops the run: queued tasks are discarded and no new dispatch is issued
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this run when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Metrics of this run so far
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Waits for the run to finish and returns its final metrics
    pub async fn wait(self) -> Result<MetricsSnapshot> {
        Ok(self.run.await?)
    }
}

/// State owned by a single crawl run
struct CrawlContext {
    run_id: u64,
    config: Arc<Config>,
    frontier: PriorityFrontier,
    tracker: VisitedUrlTracker,
    limiter: DomainRateLimiter,
    fetcher: HybridFetcher,
    batcher: Arc<ProductBatcher>,
    metrics: Arc<CrawlerMetrics>,
    cancel: CancellationToken,
}

/// Counts a worker as active for as long as it lives
struct ActiveWorker(Arc<AtomicUsize>);

impl ActiveWorker {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for ActiveWorker {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Runs the workers of one crawl to completion, then drains the batcher
async fn supervise(
    ctx: Arc<CrawlContext>,
    workers: usize,
    active: Arc<AtomicUsize>,
) -> MetricsSnapshot {
    let started = std::time::Instant::now();
    let stop_writer = CancellationToken::new();
    let writer = ctx.batcher.spawn_writer(stop_writer.clone());

    let handles: Vec<JoinHandle<()>> = (0..workers)
        .map(|id| tokio::spawn(run_worker(Arc::clone(&ctx), id, Arc::clone(&active))))
        .collect();

    for handle in handles {
        if let Err(e) = handle.await {
            error!("Worker of run {} panicked: {}", ctx.run_id, e);
        }
    }

    stop_writer.cancel();
    if let Err(e) = writer.await {
        error!("Storage writer of run {} panicked: {}", ctx.run_id, e);
    }
    ctx.batcher.flush().await;

    let snapshot = ctx.metrics.snapshot();
    let outcome = if ctx.cancel.is_cancelled() {
        "cancelled"
    } else {
        "completed"
    };
    info!(
        "Crawl run {} {}: {} pages crawled, {} products, {} failed in {:?}",
        ctx.run_id,
        outcome,
        snapshot.urls_crawled,
        snapshot.product_urls,
        snapshot.requests_failed,
        started.elapsed()
    );
    if ctx.frontier.dropped() > 0 {
        warn!(
            "Crawl run {} shed {} task(s) at the frontier ceiling",
            ctx.run_id,
            ctx.frontier.dropped()
        );
    }

    snapshot
}

async fn run_worker(ctx: Arc<CrawlContext>, id: usize, active: Arc<AtomicUsize>) {
    let _active = ActiveWorker::enter(active);
    debug!("Worker {} of run {} started", id, ctx.run_id);

    loop {
        let task = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                let discarded = ctx.frontier.cancel();
                if discarded > 0 {
                    info!("Run {} cancelled, discarded {} queued task(s)", ctx.run_id, discarded);
                }
                break;
            }
            next = ctx.frontier.dequeue() => match next {
                Some(task) => task,
                None => break,
            },
        };

        ctx.process(task).await;
    }

    debug!("Worker {} of run {} stopped", id, ctx.run_id);
}

impl CrawlContext {
    /// Handles one task from dequeue to completion
    ///
    /// Every path ends in exactly one of `frontier.complete` or
    /// `frontier.requeue`.
    async fn process(&self, task: UrlTask) {
        let permitted = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = self.limiter.acquire(&task.domain) => true,
        };
        if !permitted {
            self.frontier.complete(&task);
            return;
        }

        debug!(
            "Fetching {} ({}, depth {}, retry {})",
            task.url, task.priority, task.depth, task.retry_count
        );

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = self.fetcher.fetch(&task) => Some(result),
        };
        let Some(result) = result else {
            debug!("Fetch of {} cut short by cancellation", task.url);
            self.frontier.complete(&task);
            return;
        };

        if result.is_ok() {
            self.limiter.record_success(&task.domain);
            self.metrics
                .record_success(result.elapsed, result.strategy == Strategy::Dynamic);
            self.analyze(&task, &result).await;
            self.frontier.complete(&task);
            return;
        }

        let reason = result
            .failure
            .as_ref()
            .map(|f| f.reason.clone())
            .unwrap_or_default();

        if result.is_retryable() {
            self.limiter.record_error(&task.domain);

            if task.retry_count < self.config.crawler.max_task_retries
                && !self.cancel.is_cancelled()
            {
                self.metrics.record_retry();
                warn!(
                    "Requeueing {} (retry {}/{}): {}",
                    task.url,
                    task.retry_count + 1,
                    self.config.crawler.max_task_retries,
                    reason
                );
                let url = task.url.clone();
                if !self.frontier.requeue(task.into_retry()) {
                    debug!("Frontier closed, dropping retry of {}", url);
                }
                return;
            }
        }

        self.metrics.record_failure();
        warn!("Giving up on {}: {}", task.url, reason);
        self.batcher.push(failed_record(&task, &result)).await;
        self.frontier.complete(&task);
    }

    /// Confirms products and expands links on a successfully fetched page
    async fn analyze(&self, task: &UrlTask, result: &CrawlResult) {
        let Some(page) = result.page.as_ref() else {
            return;
        };

        if task.depth < self.config.crawler.max_depth {
            let mut queued = 0;
            for link in &page.links {
                let Some(child) = self.discover(task, link) else {
                    continue;
                };
                match self.frontier.enqueue(child) {
                    EnqueueOutcome::Queued => queued += 1,
                    other => debug!("Link {} not queued: {:?}", link, other),
                }
            }
            debug!(
                "{}: {} link(s), {} new",
                task.url,
                page.links.len(),
                queued
            );
        }

        let confirmed = is_product_url(&task.url)
            || (task.priority == Priority::High && page.has_product_markup);
        if confirmed {
            self.metrics.record_product();
            info!("Product page: {}", task.url);
            let metadata = json!({
                "title": page.title,
                "strategy": result.strategy.as_str(),
                "depth": task.depth,
                "http_status": result.http_status,
            });
            self.batcher
                .push(ProductRecord::new(
                    task.as_str(),
                    &task.domain,
                    RecordStatus::Product,
                    metadata,
                ))
                .await;
        }
    }

    /// Turns an extracted link into a new task, if it is in scope and unseen
    fn discover(&self, parent: &UrlTask, link: &str) -> Option<UrlTask> {
        let url = normalize_url(link).ok()?;

        if self.config.crawler.stay_on_domain && !same_host(&url, &parent.url) {
            return None;
        }
        if !should_follow(&url) {
            return None;
        }
        if !self.tracker.check_and_mark(url.as_str()) {
            return None;
        }

        parent.child(url).ok()
    }
}

fn failed_record(task: &UrlTask, result: &CrawlResult) -> ProductRecord {
    let failure = result.failure.as_ref();
    let metadata = json!({
        "reason": failure.map(|f| f.reason.as_str()),
        "kind": failure.map(|f| f.kind.as_str()),
        "status": result.status.as_str(),
        "http_status": result.http_status,
        "attempts": result.attempts,
        "task_retries": task.retry_count,
        "strategy": result.strategy.as_str(),
    });

    ProductRecord::new(task.as_str(), &task.domain, RecordStatus::Failed, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::storage::SqliteProductStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_CONFIG: &str = r#"
[crawler]
workers = 1
max-depth = 3
max-task-retries = 1

[rate-limit]
default-delay-ms = 0
max-delay-ms = 10

[fetch]
max-retries = 1
backoff-base-ms = 1
backoff-ceiling-ms = 5
thin-content-min-links = 0
thin-content-min-text = 0

[storage]
database-path = ":memory:"
batch-size = 1
flush-interval-ms = 50

[user-agent]
crawler-name = "TestScout"
crawler-version = "1.0"
contact-url = "https://shop.example/about"
contact-email = "admin@shop.example"
"#;

    fn scraper(workers: usize) -> (WebScraper, Arc<SqliteProductStore>) {
        let mut config = parse_config(TEST_CONFIG).unwrap();
        config.crawler.workers = workers;
        let store = Arc::new(SqliteProductStore::new_in_memory().unwrap());
        let scraper = WebScraper::new(config, store.clone(), None).unwrap();
        (scraper, store)
    }

    fn html(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
    }

    async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(server)
            .await;
    }

    async fn shop(server: &MockServer) {
        mount(
            server,
            "/",
            html(
                r#"<html><body>
                <a href="/about">About</a>
                <a href="/category/shoes">Shoes</a>
                <a href="/p/31340477">Runner</a>
                </body></html>"#,
            ),
        )
        .await;
        mount(
            server,
            "/category/shoes",
            html(
                r#"<html><body>
                <a href="/p/31340477">Runner</a>
                <a href="/p/55555555">Gone</a>
                </body></html>"#,
            ),
        )
        .await;
        mount(
            server,
            "/p/31340477",
            html("<html><head><title>Runner</title></head><body>Buy me</body></html>"),
        )
        .await;
        mount(server, "/about", html("<html><body>About us</body></html>")).await;
        mount(server, "/p/55555555", ResponseTemplate::new(404)).await;
    }

    #[tokio::test]
    async fn test_crawl_visits_by_priority_and_stores_results() {
        let server = MockServer::start().await;
        shop(&server).await;
        let (scraper, store) = scraper(1);

        let handle = scraper.start_crawl([format!("{}/", server.uri())]).unwrap();
        let snapshot = handle.wait().await.unwrap();

        let visited: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect();
        assert_eq!(
            visited,
            vec!["/", "/p/31340477", "/category/shoes", "/p/55555555", "/about"]
        );

        assert_eq!(snapshot.urls_crawled, 4);
        assert_eq!(snapshot.product_urls, 1);
        assert_eq!(snapshot.requests_failed, 1);
        assert!((snapshot.error_rate - 0.2).abs() < 1e-9);

        assert_eq!(store.count_by_status(RecordStatus::Product).unwrap(), 1);
        assert_eq!(store.count_by_status(RecordStatus::Failed).unwrap(), 1);
        let products = store.urls_by_status(RecordStatus::Product).unwrap();
        assert!(products[0].ends_with("/p/31340477"));

        assert_eq!(scraper.get_metrics(), snapshot);
    }

    #[tokio::test]
    async fn test_parallel_workers_reach_quiescence() {
        let server = MockServer::start().await;
        shop(&server).await;
        let (scraper, store) = scraper(4);

        let snapshot = scraper
            .start_crawl([format!("{}/", server.uri())])
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(snapshot.urls_crawled, 4);
        assert_eq!(snapshot.product_urls, 1);
        assert_eq!(store.count_by_status(RecordStatus::Product).unwrap(), 1);
        assert_eq!(scraper.health().active_scrapers, 0);
    }

    #[tokio::test]
    async fn test_max_depth_limits_expansion() {
        let server = MockServer::start().await;
        shop(&server).await;
        let mut config = parse_config(TEST_CONFIG).unwrap();
        config.crawler.max_depth = 0;
        let store = Arc::new(SqliteProductStore::new_in_memory().unwrap());
        let scraper = WebScraper::new(config, store, None).unwrap();

        let snapshot = scraper
            .start_crawl([format!("{}/", server.uri())])
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(snapshot.urls_crawled, 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_is_requeued_then_recorded() {
        let server = MockServer::start().await;
        mount(&server, "/", ResponseTemplate::new(503)).await;
        let (scraper, store) = scraper(1);

        let snapshot = scraper
            .start_crawl([format!("{}/", server.uri())])
            .unwrap()
            .wait()
            .await
            .unwrap();

        // Two fetch attempts per dispatch, and one scheduling-level requeue
        assert_eq!(server.received_requests().await.unwrap().len(), 4);
        assert_eq!(snapshot.retries, 1);
        assert_eq!(snapshot.requests_failed, 1);
        assert_eq!(snapshot.urls_crawled, 0);
        assert_eq!(store.count_by_status(RecordStatus::Failed).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fetch_recovering_from_503s_counts_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(300)))
            .up_to_n_times(3)
            .mount(&server)
            .await;
        mount(&server, "/", html("<html><body>Back in stock</body></html>")).await;

        let mut config = parse_config(TEST_CONFIG).unwrap();
        config.crawler.max_depth = 0;
        config.fetch.max_retries = 3;
        let store = Arc::new(SqliteProductStore::new_in_memory().unwrap());
        let scraper = WebScraper::new(config, store, None).unwrap();

        let snapshot = scraper
            .start_crawl([format!("{}/", server.uri())])
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(server.received_requests().await.unwrap().len(), 4);
        assert_eq!(snapshot.urls_crawled, 1);
        assert_eq!(snapshot.requests_failed, 0);
        assert_eq!(snapshot.retries, 0);
        assert_eq!(snapshot.error_rate, 0.0);
        // Only the final, fast attempt is timed
        assert!(snapshot.avg_response_time < 0.15);
    }

    #[tokio::test]
    async fn test_finish_shuts_down_when_run_fails() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/",
            html("<html><body>slow</body></html>").set_delay(Duration::from_secs(30)),
        )
        .await;
        let (scraper, _store) = scraper(1);

        let handle = scraper.start_crawl([format!("{}/", server.uri())]).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.run.abort();

        let result = scraper.finish(handle).await;
        assert!(matches!(result, Err(CrawlError::Join(_))));
        assert_eq!(scraper.health().status, "shutting_down");

        // Workers of the failed run still observe the shutdown
        tokio::time::timeout(Duration::from_secs(5), async {
            while scraper.health().active_scrapers > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("workers should stop after shutdown");
    }

    #[tokio::test]
    async fn test_cancel_stops_run() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/",
            html("<html><body>slow</body></html>").set_delay(Duration::from_secs(30)),
        )
        .await;
        let (scraper, _store) = scraper(2);

        let handle = scraper.start_crawl([format!("{}/", server.uri())]).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();

        let snapshot = tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .expect("cancelled run should finish promptly")
            .unwrap();
        assert_eq!(snapshot.urls_crawled, 0);
        assert_eq!(snapshot.requests_failed, 0);
    }

    #[tokio::test]
    async fn test_invalid_seeds_are_rejected() {
        let (scraper, _store) = scraper(1);
        let result = scraper.start_crawl(["", "   "]);
        assert!(matches!(result, Err(CrawlError::NoSeeds(seeds)) if seeds.len() == 2));
    }

    #[tokio::test]
    async fn test_health_and_shutdown() {
        let (scraper, _store) = scraper(1);
        assert_eq!(
            scraper.health(),
            HealthStatus {
                status: "ok",
                active_scrapers: 0
            }
        );

        scraper.shutdown().await;
        assert_eq!(scraper.health().status, "shutting_down");
        assert!(matches!(
            scraper.start_crawl(["shop.example/"]),
            Err(CrawlError::ShutDown)
        ));
    }

    #[tokio::test]
    async fn test_runs_are_independent() {
        let server = MockServer::start().await;
        shop(&server).await;
        let (scraper, _store) = scraper(2);
        let seed = format!("{}/", server.uri());

        let first = scraper.start_crawl([seed.clone()]).unwrap();
        let second = scraper.start_crawl([seed]).unwrap();
        let a = first.wait().await.unwrap();
        let b = second.wait().await.unwrap();

        assert_eq!(a.urls_crawled, 4);
        assert_eq!(b.urls_crawled, 4);
        assert_eq!(scraper.get_metrics().urls_crawled, 8);
    }
}
