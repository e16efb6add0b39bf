use crate::config::types::{
    BrowserConfig, Config, CrawlerConfig, DedupConfig, FetchConfig, RateLimitConfig,
    StorageConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_dedup_config(&config.dedup)?;
    validate_browser_config(&config.browser)?;
    validate_fetch_config(&config.fetch)?;
    validate_storage_config(&config.storage)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 256, got {}",
            config.workers
        )));
    }

    if config.frontier_capacity < 1 {
        return Err(ConfigError::Validation(
            "frontier-capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.backoff_multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff-multiplier must be >= 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    if config.max_delay_ms < config.default_delay_ms {
        return Err(ConfigError::Validation(format!(
            "max-delay-ms ({}) must be >= default-delay-ms ({})",
            config.max_delay_ms, config.default_delay_ms
        )));
    }

    for entry in &config.overrides {
        validate_domain_pattern(&entry.domain)?;
    }

    Ok(())
}

fn validate_dedup_config(config: &DedupConfig) -> Result<(), ConfigError> {
    if config.expected_urls < 1 {
        return Err(ConfigError::Validation(
            "expected-urls must be >= 1".to_string(),
        ));
    }

    if !(config.false_positive_rate > 0.0 && config.false_positive_rate < 1.0) {
        return Err(ConfigError::Validation(format!(
            "false-positive-rate must be in (0, 1), got {}",
            config.false_positive_rate
        )));
    }

    if config.recent_capacity < 1 {
        return Err(ConfigError::Validation(
            "recent-capacity must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.max_sessions < 1 || config.max_sessions > 64 {
        return Err(ConfigError::Validation(format!(
            "max-sessions must be between 1 and 64, got {}",
            config.max_sessions
        )));
    }

    Url::parse(&config.webdriver_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webdriver-url: {}", e)))?;

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.backoff_ceiling_ms < config.backoff_base_ms {
        return Err(ConfigError::Validation(format!(
            "backoff-ceiling-ms ({}) must be >= backoff-base-ms ({})",
            config.backoff_ceiling_ms, config.backoff_base_ms
        )));
    }

    if !(0.0..=0.5).contains(&config.jitter_ratio) {
        return Err(ConfigError::Validation(format!(
            "jitter-ratio must be between 0.0 and 0.5, got {}",
            config.jitter_ratio
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1".to_string(),
        ));
    }

    if config.flush_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "flush-interval-ms must be >= 1".to_string(),
        ));
    }

    if config.buffer_capacity < config.batch_size {
        return Err(ConfigError::Validation(format!(
            "buffer-capacity ({}) must be >= batch-size ({})",
            config.buffer_capacity, config.batch_size
        )));
    }

    Ok(())
}

/// Checks the identity advertised in the User-Agent header
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    let name = config.crawler_name.as_str();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ConfigError::Validation(format!(
            "user-agent.crawler-name must be non-empty ASCII letters, digits or '-', got '{}'",
            name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent.crawler-version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("user-agent.contact-url '{}': {}", config.contact_url, e))
    })?;

    if !is_plausible_email(&config.contact_email) {
        return Err(ConfigError::Validation(format!(
            "user-agent.contact-email '{}' is not an email address",
            config.contact_email
        )));
    }

    Ok(())
}

/// Accepts `shop.example` or `*.shop.example` style host patterns
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let host = pattern.strip_prefix("*.").unwrap_or(pattern);

    let labels_ok = !host.is_empty()
        && host.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });

    if labels_ok {
        Ok(())
    } else {
        Err(ConfigError::InvalidPattern(format!(
            "rate-limit override domain '{}' is not a host name or *.host pattern",
            pattern
        )))
    }
}

/// `local@host.tld` with exactly one `@`
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, host)) => {
            !local.is_empty() && !host.contains('@') && host.contains('.') && !host.ends_with('.')
        }
        None => false,
    }
}
