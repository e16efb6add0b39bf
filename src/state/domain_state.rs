use std::time::Duration;
use tokio::time::Instant;

/// Tracks the dispatch state of a single domain
///
/// One instance exists per domain seen during a crawl run. It is only mutated by
/// the rate limiter while holding that domain's lock.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// The domain this state belongs to
    pub domain: String,

    /// The latest dispatch slot handed out for this domain
    pub last_dispatch: Option<Instant>,

    /// Baseline spacing between dispatches
    pub min_delay: Duration,

    /// Retryable failures since the last success
    pub consecutive_errors: u32,
}

impl DomainState {
    /// Creates a new DomainState with the given baseline delay
    pub fn new(domain: impl Into<String>, min_delay: Duration) -> Self {
        Self {
            domain: domain.into(),
            last_dispatch: None,
            min_delay,
            consecutive_errors: 0,
        }
    }

    /// Spacing currently in force for this domain
    ///
    /// The baseline delay grows by `multiplier` per consecutive error and is
    /// capped at `ceiling`. It never drops below the baseline.
    pub fn effective_delay(&self, multiplier: f64, ceiling: Duration) -> Duration {
        if self.consecutive_errors == 0 {
            return self.min_delay;
        }

        let exponent = self.consecutive_errors.min(32) as i32;
        let scaled = self.min_delay.as_secs_f64() * multiplier.powi(exponent);
        let capped = scaled.min(ceiling.as_secs_f64());

        Duration::from_secs_f64(capped).max(self.min_delay)
    }

    /// Claims the next dispatch slot and records it
    ///
    /// The slot is `max(now, last_dispatch + delay)`, so successive claims are
    /// spaced by at least `delay` and `last_dispatch` never moves backwards.
    pub fn reserve_slot(&mut self, delay: Duration, now: Instant) -> Instant {
        let slot = match self.last_dispatch {
            Some(last) => std::cmp::max(now, last + delay),
            None => now,
        };
        self.last_dispatch = Some(slot);
        slot
    }

    /// Records a retryable failure (timeouts, 5xx, 429)
    pub fn record_error(&mut self) {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
    }

    /// Records a successful fetch, resetting the backoff
    pub fn record_success(&mut self) {
        self.consecutive_errors = 0;
    }
}
