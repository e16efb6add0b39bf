//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run full crawls
//! through the public `WebScraper` API, writing to a SQLite file.

use async_trait::async_trait;
use product_scout::browser::{RenderError, RenderSession, SessionFactory};
use product_scout::config::{
    BrowserConfig, Config, CrawlerConfig, DedupConfig, FetchConfig, RateLimitConfig,
    StorageConfig, UserAgentConfig,
};
use product_scout::output::load_statistics;
use product_scout::state::RecordStatus;
use product_scout::storage::{ProductStore, SqliteProductStore};
use product_scout::WebScraper;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing to the given database
fn create_test_config(db_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers: 3,
            max_depth: 2,
            ..Default::default()
        },
        rate_limit: RateLimitConfig {
            default_delay_ms: 5, // Very short for testing
            max_delay_ms: 50,
            ..Default::default()
        },
        dedup: DedupConfig {
            expected_urls: 1_000,
            ..Default::default()
        },
        browser: BrowserConfig::default(),
        fetch: FetchConfig {
            max_retries: 1,
            backoff_base_ms: 1,
            backoff_ceiling_ms: 10,
            request_timeout_secs: 5,
            ..Default::default()
        },
        storage: StorageConfig {
            database_path: db_path.display().to_string(),
            batch_size: 2,
            flush_interval_ms: 50,
            buffer_capacity: 100,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// A shop whose pages are fully server-rendered
async fn mount_static_shop(server: &MockServer) {
    let filler = "Free shipping on all orders over fifty dollars. ".repeat(5);

    mount_page(
        server,
        "/",
        format!(
            r#"<html><head><title>Shop</title></head><body><p>{}</p>
            <a href="/category/shoes">Shoes</a>
            <a href="/category/boots">Boots</a>
            <a href="/about">About</a>
            <a href="/cart">Cart</a>
            <a href="https://elsewhere.example/p/99999999">Partner</a>
            </body></html>"#,
            filler
        ),
    )
    .await;

    mount_page(
        server,
        "/category/shoes",
        format!(
            r#"<html><body><p>{}</p>
            <a href="/p/10000001">Runner</a>
            <a href="/p/10000002?utm_source=mail">Trail</a>
            <a href="/category/shoes/page/2">Next</a>
            </body></html>"#,
            filler
        ),
    )
    .await;

    mount_page(
        server,
        "/category/boots",
        format!(
            r#"<html><body><p>{}</p>
            <a href="/p/10000003">Hiker</a>
            <a href="/p/10000001">Runner again</a>
            <a href="/">Home</a>
            </body></html>"#,
            filler
        ),
    )
    .await;

    for id in ["10000001", "10000002", "10000003"] {
        mount_page(
            server,
            &format!("/p/{}", id),
            format!(
                r#"<html><head><title>Product {}</title></head><body><p>{}</p>
                <a href="/category/shoes">Back</a><a href="/">Home</a><a href="/about">About</a>
                </body></html>"#,
                id, filler
            ),
        )
        .await;
    }

    mount_page(server, "/about", format!("<html><body><p>{}</p></body></html>", filler)).await;

    // Unmounted paths (the second listing page) answer 404 and are recorded as failed
}

#[tokio::test]
async fn test_full_crawl_persists_products() {
    let server = MockServer::start().await;
    mount_static_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("products.db");
    let store = Arc::new(SqliteProductStore::new(&db_path).unwrap());
    let scraper = WebScraper::new(create_test_config(&db_path), store, None).unwrap();

    let handle = scraper.start_crawl([format!("{}/", server.uri())]).unwrap();
    let snapshot = handle.wait().await.unwrap();

    // Home, two categories, three products, about
    assert_eq!(snapshot.urls_crawled, 7);
    assert_eq!(snapshot.product_urls, 3);
    // The second shoes listing page is not mounted
    assert_eq!(snapshot.requests_failed, 1);
    assert_eq!(snapshot.storage_errors, 0);

    let requested: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert!(!requested.iter().any(|p| p == "/cart"));
    assert_eq!(
        requested.iter().filter(|p| p.as_str() == "/p/10000001").count(),
        1,
        "each URL is fetched once"
    );

    // Reopen the database to check what was persisted
    let reopened = SqliteProductStore::new(&db_path).unwrap();
    let stats = load_statistics(&reopened).unwrap();
    assert_eq!(stats.products, 3);
    assert_eq!(stats.failed, 1);

    let products = reopened.urls_by_status(RecordStatus::Product).unwrap();
    assert!(products.iter().all(|u| u.contains("/p/1000000")));
    assert!(products.iter().all(|u| !u.contains("utm_source")));
}

#[tokio::test]
async fn test_repeated_crawl_is_idempotent() {
    let server = MockServer::start().await;
    mount_static_shop(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("products.db");
    let store = Arc::new(SqliteProductStore::new(&db_path).unwrap());
    let scraper = WebScraper::new(create_test_config(&db_path), store.clone(), None).unwrap();
    let seed = format!("{}/", server.uri());

    scraper.start_crawl([seed.clone()]).unwrap().wait().await.unwrap();
    scraper.start_crawl([seed]).unwrap().wait().await.unwrap();

    assert_eq!(store.count_by_status(RecordStatus::Product).unwrap(), 3);
    assert_eq!(store.count_by_status(RecordStatus::Failed).unwrap(), 1);
    assert_eq!(scraper.get_metrics().urls_crawled, 14);
}

/// Renders pages from a fixed map, the way a browser would after running scripts
struct ScriptedBrowser {
    pages: Arc<HashMap<String, String>>,
    renders: Arc<AtomicUsize>,
}

struct ScriptedSession {
    pages: Arc<HashMap<String, String>>,
    renders: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderSession for ScriptedSession {
    async fn render(&mut self, url: &Url) -> Result<String, RenderError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.pages
            .get(url.path())
            .cloned()
            .ok_or_else(|| RenderError::Navigation(format!("no page at {}", url)))
    }

    async fn close(self: Box<Self>) {}
}

#[async_trait]
impl SessionFactory for ScriptedBrowser {
    async fn launch(&self) -> Result<Box<dyn RenderSession>, RenderError> {
        Ok(Box::new(ScriptedSession {
            pages: Arc::clone(&self.pages),
            renders: Arc::clone(&self.renders),
        }))
    }
}

#[tokio::test]
async fn test_script_rendered_shop_switches_to_browser() {
    let server = MockServer::start().await;

    // Over plain HTTP the shop only serves an empty application shell
    Mock::given(method("GET"))
        .respond_with(html(
            r#"<html><body><div id="root"></div><script src="/app.js"></script></body></html>"#
                .to_string(),
        ))
        .mount(&server)
        .await;

    let mut pages = HashMap::new();
    pages.insert(
        "/".to_string(),
        r#"<html><body><a href="/p/20000001">One</a><a href="/p/20000002">Two</a></body></html>"#
            .to_string(),
    );
    for id in ["20000001", "20000002"] {
        pages.insert(
            format!("/p/{}", id),
            format!(
                r#"<html><head><title>Item {}</title></head><body>In stock</body></html>"#,
                id
            ),
        );
    }
    let renders = Arc::new(AtomicUsize::new(0));
    let browser = ScriptedBrowser {
        pages: Arc::new(pages),
        renders: Arc::clone(&renders),
    };

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("products.db");
    let store = Arc::new(SqliteProductStore::new(&db_path).unwrap());
    let scraper = WebScraper::new(
        create_test_config(&db_path),
        store.clone(),
        Some(Arc::new(browser)),
    )
    .unwrap();

    let snapshot = scraper
        .start_crawl([format!("{}/", server.uri())])
        .unwrap()
        .wait()
        .await
        .unwrap();

    // Only the seed went over HTTP; the domain was then flagged for rendering
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
    assert_eq!(renders.load(Ordering::SeqCst), 3);
    assert_eq!(snapshot.urls_crawled, 3);
    assert_eq!(snapshot.rendered_pages, 3);
    assert_eq!(snapshot.product_urls, 2);
    assert_eq!(store.count_by_status(RecordStatus::Product).unwrap(), 2);

    scraper.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_seed_is_recorded_as_failed() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("products.db");
    let store = Arc::new(SqliteProductStore::new(&db_path).unwrap());
    let mut config = create_test_config(&db_path);
    config.crawler.max_task_retries = 0;
    let scraper = WebScraper::new(config, store.clone(), None).unwrap();

    // Nothing listens on port 1
    let snapshot = scraper
        .start_crawl(["http://127.0.0.1:1/"])
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(snapshot.urls_crawled, 0);
    assert_eq!(snapshot.requests_failed, 1);
    assert!((snapshot.error_rate - 1.0).abs() < f64::EPSILON);
    assert_eq!(store.count_by_status(RecordStatus::Failed).unwrap(), 1);
}
