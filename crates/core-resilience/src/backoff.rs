//! Retry policy and decorrelated-jitter backoff
//!
//! The schedule is "fast first": the first retry fires immediately, later
//! retries sleep for a random delay drawn between the seed and three times
//! the previous delay, capped at `max_backoff`. Randomising each delay
//! relative to the previous one keeps concurrent callers from retrying in
//! lock-step.

use rand::Rng;
use std::time::Duration;

/// Statuses that are considered transient by default
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the initial one
    pub max_attempts: u32,
    /// Base delay the jitter is seeded with
    pub backoff_seed: Duration,
    /// Upper bound for a single delay
    pub max_backoff: Duration,
    /// Whether the first retry skips the delay
    pub fast_first: bool,
    /// Response statuses worth retrying
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            backoff_seed: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            fast_first: true,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Fresh backoff schedule for one call
    pub fn backoff(&self) -> DecorrelatedJitter {
        DecorrelatedJitter::new(self.backoff_seed, self.max_backoff, self.fast_first)
    }
}

/// Decorrelated jitter delay generator, one per outbound call
#[derive(Debug, Clone)]
pub struct DecorrelatedJitter {
    seed: Duration,
    cap: Duration,
    fast_first: bool,
    retries: u32,
    previous: Duration,
}

impl DecorrelatedJitter {
    pub fn new(seed: Duration, cap: Duration, fast_first: bool) -> Self {
        Self {
            seed,
            cap: cap.max(seed),
            fast_first,
            retries: 0,
            previous: seed,
        }
    }

    /// Delay before the next retry, drawn from the thread-local RNG
    pub fn next_delay(&mut self) -> Duration {
        self.next_delay_with(&mut rand::rng())
    }

    /// Delay before the next retry, drawn from `rng`
    pub fn next_delay_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
        self.retries += 1;
        if self.fast_first && self.retries == 1 {
            return Duration::ZERO;
        }

        let low = as_nanos(self.seed);
        let high = as_nanos(self.previous).saturating_mul(3).max(low);
        let drawn = Duration::from_nanos(rng.random_range(low..=high));
        let delay = drawn.min(self.cap);
        self.previous = delay;
        delay
    }
}

impl Iterator for DecorrelatedJitter {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}

fn as_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 6);
        assert_eq!(policy.backoff_seed, Duration::from_secs(1));
        assert!(policy.fast_first);
        for status in [500, 502, 503, 504] {
            assert!(policy.is_retryable_status(status));
        }
        for status in [400, 404, 429, 501] {
            assert!(!policy.is_retryable_status(status));
        }
    }

    #[test]
    fn test_fast_first_retry_has_no_delay() {
        let mut backoff = RetryPolicy::default().backoff();
        assert_eq!(backoff.next_delay(), Duration::ZERO);
        assert!(backoff.next_delay() >= Duration::from_secs(1));
    }

    #[test]
    fn test_without_fast_first_starts_at_seed() {
        let mut backoff =
            DecorrelatedJitter::new(Duration::from_millis(100), Duration::from_secs(1), false);
        let first = backoff.next_delay();
        assert!(first >= Duration::from_millis(100));
        assert!(first <= Duration::from_millis(300));
    }

    #[test]
    fn test_delays_stay_within_seed_and_cap() {
        let seed = Duration::from_secs(1);
        let cap = Duration::from_secs(10);
        for _ in 0..200 {
            let delays: Vec<_> = DecorrelatedJitter::new(seed, cap, true).take(8).collect();
            assert_eq!(delays[0], Duration::ZERO);
            for window in delays[1..].windows(2) {
                assert!(window[1] >= seed);
                assert!(window[1] <= cap);
                assert!(window[1] <= window[0] * 3);
            }
        }
    }

    #[test]
    fn test_delays_are_jittered() {
        let seed = Duration::from_secs(1);
        let cap = Duration::from_secs(60);
        let samples: std::collections::HashSet<_> = (0..50)
            .map(|_| {
                let mut backoff = DecorrelatedJitter::new(seed, cap, false);
                backoff.next_delay();
                backoff.next_delay()
            })
            .collect();
        assert!(samples.len() > 1);
    }
}
