//! Product-Scout main entry point
//!
//! This is the command-line interface for the Product-Scout crawler.

use anyhow::{Context, Result};
use clap::Parser;
use product_scout::config::{load_config_with_hash, Config};
use product_scout::output::{load_statistics, print_run_summary, print_statistics};
use product_scout::storage::open_storage;
use product_scout::url::parse_seed;
use product_scout::WebScraper;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Product-Scout: a product-page discovery crawler
///
/// Product-Scout crawls outward from the given shop domains, fetching pages
/// over HTTP or through WebDriver browser sessions, and stores the URLs it
/// confirms as product-detail pages.
#[derive(Parser, Debug)]
#[command(name = "product-scout")]
#[command(version = "1.0.0")]
#[command(about = "A product-page discovery crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Domains or URLs to start from (e.g. shop.example/)
    #[arg(value_name = "DOMAIN", required_unless_present = "stats")]
    domains: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the normalized seeds without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show counts of stored product and failed URLs and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, &cli.domains);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, &cli.domains).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("product_scout=info,warn"),
            1 => EnvFilter::new("product_scout=debug,info"),
            2 => EnvFilter::new("product_scout=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective settings and seeds
fn handle_dry_run(config: &Config, domains: &[String]) {
    println!("=== Product-Scout Dry Run ===\n");

    println!("Crawler:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Frontier capacity: {}", config.crawler.frontier_capacity);
    println!("  Task retries: {}", config.crawler.max_task_retries);
    println!("  Stay on domain: {}", config.crawler.stay_on_domain);

    println!("\nRate limiting:");
    println!("  Default delay: {}ms", config.rate_limit.default_delay_ms);
    println!("  Max delay: {}ms", config.rate_limit.max_delay_ms);
    for entry in &config.rate_limit.overrides {
        println!("  - {}: {}ms", entry.domain, entry.delay_ms);
    }

    println!("\nFetching:");
    println!("  Max retries: {}", config.fetch.max_retries);
    println!(
        "  Backoff: {}ms base, {}ms ceiling",
        config.fetch.backoff_base_ms, config.fetch.backoff_ceiling_ms
    );
    println!(
        "  Browser: {} session(s) at {}",
        config.browser.max_sessions, config.browser.webdriver_url
    );

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);
    println!(
        "  Batch: {} record(s) or every {}ms",
        config.storage.batch_size, config.storage.flush_interval_ms
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nSeeds ({}):", domains.len());
    let mut valid = 0;
    for domain in domains {
        match parse_seed(domain) {
            Ok(url) => {
                valid += 1;
                println!("  - {}", url);
            }
            Err(e) => println!("  ! {} ({})", domain, e),
        }
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed URL(s)", valid);
}

/// Handles the --stats mode: shows what the product store holds
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let store = open_storage(Path::new(&config.storage.database_path))
        .context("failed to open the product database")?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, domains: &[String]) -> Result<()> {
    let scraper = WebScraper::from_config(config)?;
    let handle = scraper.start_crawl(domains)?;

    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            cancel.cancel();
        }
    });

    let snapshot = scraper.finish(handle).await?;

    println!("{}", snapshot.to_json());
    print_run_summary(&snapshot);

    Ok(())
}
