//! Per-domain dispatch spacing
//!
//! This module handles:
//! - Minimum delay between requests to the same domain
//! - Per-domain delay overrides (exact or wildcard patterns)
//! - Multiplicative backoff for domains that keep failing

use crate::config::{DelayOverride, RateLimitConfig};
use crate::state::DomainState;
use crate::url::matches_wildcard;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Gates dispatch so that requests to one domain are spaced by its delay
///
/// Every domain has its own lock around its `DomainState`; the map lock is only
/// held long enough to look the entry up. No lock is held while a caller
/// sleeps: `acquire` reserves a dispatch slot under the domain lock, releases
/// it, then waits until the slot arrives.
pub struct DomainRateLimiter {
    /// Per-domain state, created on first sight
    domains: Mutex<HashMap<String, Arc<Mutex<DomainState>>>>,

    /// Delay used for domains without an override
    default_delay: Duration,

    /// Per-domain delay overrides
    overrides: Vec<DelayOverride>,

    /// Growth factor per consecutive error
    backoff_multiplier: f64,

    /// Ceiling on the backed-off delay
    max_delay: Duration,
}

impl DomainRateLimiter {
    /// Creates a new rate limiter
    ///
    /// # Arguments
    ///
    /// * `config` - The rate-limit configuration
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            domains: Mutex::new(HashMap::new()),
            default_delay: Duration::from_millis(config.default_delay_ms),
            overrides: config.overrides.clone(),
            backoff_multiplier: config.backoff_multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Waits until a request to `domain` may be dispatched
    ///
    /// Dispatches to the same domain are spaced by at least the domain's
    /// effective delay, even after an idle period, and even when many workers
    /// call concurrently.
    ///
    /// # Returns
    ///
    /// How long the caller was held back
    pub async fn acquire(&self, domain: &str) -> Duration {
        let state = self.state(domain);
        let now = Instant::now();

        let slot = {
            let mut state = lock(&state);
            let delay = state.effective_delay(self.backoff_multiplier, self.max_delay);
            state.reserve_slot(delay, now)
        };

        if slot > now {
            tracing::trace!("Holding {} for {:?}", domain, slot - now);
            tokio::time::sleep_until(slot).await;
        }

        slot - now
    }

    /// Records a successful fetch, resetting the domain's backoff
    pub fn record_success(&self, domain: &str) {
        lock(&self.state(domain)).record_success();
    }

    /// Records a retryable failure, growing the domain's delay
    pub fn record_error(&self, domain: &str) {
        let state = self.state(domain);
        let mut state = lock(&state);
        state.record_error();

        if state.consecutive_errors >= 3 {
            tracing::warn!(
                "Domain {} has failed {} times in a row, backing off to {:?}",
                domain,
                state.consecutive_errors,
                state.effective_delay(self.backoff_multiplier, self.max_delay)
            );
        }
    }

    /// Returns the delay currently in force for a domain
    pub fn current_delay(&self, domain: &str) -> Duration {
        lock(&self.state(domain)).effective_delay(self.backoff_multiplier, self.max_delay)
    }

    /// Returns the configured baseline delay for a domain
    ///
    /// An exact override wins over a wildcard one; the first matching wildcard
    /// wins among wildcards.
    pub fn base_delay_for(&self, domain: &str) -> Duration {
        let exact = self.overrides.iter().find(|o| o.domain == domain);
        let matched =
            exact.or_else(|| self.overrides.iter().find(|o| matches_wildcard(&o.domain, domain)));

        matched
            .map(|o| Duration::from_millis(o.delay_ms))
            .unwrap_or(self.default_delay)
    }

    /// Number of domains seen so far
    pub fn domain_count(&self) -> usize {
        self.domains.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn state(&self, domain: &str) -> Arc<Mutex<DomainState>> {
        let mut domains = self.domains.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(state) = domains.get(domain) {
            return Arc::clone(state);
        }

        let state = Arc::new(Mutex::new(DomainState::new(
            domain,
            self.base_delay_for(domain),
        )));
        domains.insert(domain.to_string(), Arc::clone(&state));
        state
    }
}

fn lock(state: &Mutex<DomainState>) -> MutexGuard<'_, DomainState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}
