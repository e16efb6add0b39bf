use rand::Rng;
use std::time::Duration;

/// Exponential backoff schedule for fetch retries
///
/// The delay before retry `attempt` (0-based) is `base * 2^attempt`, capped at
/// `ceiling`, plus a random jitter of up to `jitter_ratio` of that delay. Jitter
/// is only ever added, at most half the delay, and the result is capped again:
/// even worst-case draws give a non-decreasing sequence bounded by the ceiling.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub ceiling: Duration,
    pub jitter_ratio: f64,
}

impl BackoffPolicy {
    pub fn new(base: Duration, ceiling: Duration, jitter_ratio: f64) -> Self {
        Self {
            base,
            ceiling,
            jitter_ratio: jitter_ratio.clamp(0.0, 0.5),
        }
    }

    /// Delay before retry `attempt`, with jitter drawn from the thread RNG
    pub fn delay(&self, attempt: u32) -> Duration {
        let unit: f64 = rand::thread_rng().gen_range(0.0..=1.0);
        self.delay_with_jitter(attempt, unit)
    }

    /// Delay before retry `attempt` for a given jitter draw in `[0, 1]`
    pub fn delay_with_jitter(&self, attempt: u32, unit: f64) -> Duration {
        let delay = backoff_delay(attempt, self.base, self.ceiling);
        let scale = self.jitter_ratio * unit.clamp(0.0, 1.0);
        let jitter = Duration::from_nanos((delay.as_nanos() as f64 * scale) as u64);
        (delay + jitter).min(self.ceiling)
    }
}

/// Jitter-free backoff: `min(base * 2^attempt, ceiling)`
///
/// ```
/// use product_scout::crawler::backoff_delay;
/// use std::time::Duration;
///
/// let base = Duration::from_millis(500);
/// let ceiling = Duration::from_secs(3);
/// assert_eq!(backoff_delay(0, base, ceiling), Duration::from_millis(500));
/// assert_eq!(backoff_delay(2, base, ceiling), Duration::from_secs(2));
/// assert_eq!(backoff_delay(3, base, ceiling), ceiling);
/// ```
pub fn backoff_delay(attempt: u32, base: Duration, ceiling: Duration) -> Duration {
    let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(ceiling).min(ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_ceiling() {
        let base = Duration::from_millis(100);
        let ceiling = Duration::from_millis(1000);

        let delays: Vec<_> = (0..6).map(|a| backoff_delay(a, base, ceiling)).collect();
        assert_eq!(
            delays,
            [100, 200, 400, 800, 1000, 1000].map(Duration::from_millis)
        );
    }

    #[test]
    fn test_backoff_large_attempts_do_not_overflow() {
        let ceiling = Duration::from_secs(30);
        assert_eq!(backoff_delay(64, Duration::from_secs(1), ceiling), ceiling);
        assert_eq!(backoff_delay(u32::MAX, Duration::from_secs(1), ceiling), ceiling);
    }

    #[test]
    fn test_jittered_delays_are_bounded() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(2), 0.25);

        for attempt in 0..10 {
            let floor = backoff_delay(attempt, policy.base, policy.ceiling);
            for _ in 0..50 {
                let delay = policy.delay(attempt);
                assert!(delay >= floor);
                assert!(delay <= policy.ceiling);
            }
        }
    }

    #[test]
    fn test_jitter_extremes() {
        let policy = BackoffPolicy::new(Duration::from_millis(400), Duration::from_secs(10), 0.25);
        assert_eq!(policy.delay_with_jitter(0, 0.0), Duration::from_millis(400));
        assert_eq!(policy.delay_with_jitter(0, 1.0), Duration::from_millis(500));
        assert_eq!(policy.delay_with_jitter(1, 1.0), Duration::from_millis(1000));
    }

    #[test]
    fn test_worst_case_sequence_is_non_decreasing() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_millis(700), 0.5);

        // Max jitter on one attempt, none on the next
        for attempt in 0..8 {
            let high = policy.delay_with_jitter(attempt, 1.0);
            let low_next = policy.delay_with_jitter(attempt + 1, 0.0);
            assert!(low_next >= high, "attempt {}: {:?} > {:?}", attempt, high, low_next);
        }
    }

    #[test]
    fn test_jitter_ratio_is_clamped() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(1), 3.0);
        assert_eq!(policy.jitter_ratio, 0.5);
    }
}
