//! Exponential backoff for stage retries.
//!
//! Unlike a background-loop backoff this one is deterministic: the same
//! policy always produces the same delays, so runs are reproducible.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy applied to transient stage failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts in total, including the first.
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub backoff_rate: f64,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_secs(2),
            backoff_rate: 2.0,
            max_interval: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn with_initial_interval(mut self, initial_interval: Duration) -> Self {
        self.initial_interval = initial_interval;
        self
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self)
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
    rate: f64,
    attempts_left: u32,
}

impl Backoff {
    pub fn new(policy: &RetryPolicy) -> Self {
        let max = policy.max_interval.max(policy.initial_interval);
        Self {
            current: policy.initial_interval.min(max),
            max,
            rate: if policy.backoff_rate.is_finite() && policy.backoff_rate >= 1.0 {
                policy.backoff_rate
            } else {
                1.0
            },
            attempts_left: policy.max_attempts.max(1).saturating_sub(1),
        }
    }

    /// Delay before the next attempt, or `None` once retries are exhausted.
    pub fn fail(&mut self) -> Option<Duration> {
        if self.attempts_left == 0 {
            return None;
        }
        self.attempts_left -= 1;
        let delay = self.current;
        let next_nanos = (self.current.as_nanos() as f64 * self.rate).round() as u64;
        self.current = Duration::from_nanos(next_nanos).min(self.max);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_waits_two_then_four_seconds() {
        let mut backoff = RetryPolicy::default().backoff();
        assert_eq!(backoff.fail(), Some(Duration::from_secs(2)));
        assert_eq!(backoff.fail(), Some(Duration::from_secs(4)));
        assert_eq!(backoff.fail(), None);
    }

    #[test]
    fn fail_saturates_at_max() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_interval: Duration::from_millis(10),
            backoff_rate: 2.0,
            max_interval: Duration::from_millis(20),
        };
        let mut backoff = policy.backoff();
        assert_eq!(backoff.fail(), Some(Duration::from_millis(10)));
        assert_eq!(backoff.fail(), Some(Duration::from_millis(20)));
        assert_eq!(backoff.fail(), Some(Duration::from_millis(20)));
        assert_eq!(backoff.fail(), Some(Duration::from_millis(20)));
        assert_eq!(backoff.fail(), None);
    }

    #[test]
    fn single_attempt_policy_never_retries() {
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff().fail(), None);
    }
}
