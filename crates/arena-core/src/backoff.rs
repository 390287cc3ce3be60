//! Exponential backoff for rate-limited match requests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackoffPolicy {
    /// First wait after a rate-limit response (milliseconds).
    pub base_delay_ms: u64,
    /// Consecutive rate-limit retries allowed per match (`None` = unbounded).
    pub max_retries: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 10_000,
            max_retries: None,
        }
    }
}

impl BackoffPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Backoff state for one run: the delay doubles on every rate-limit event
/// and drops back to the base after a successful match.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    next_delay: Duration,
    retries: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        let next_delay = policy.base_delay();
        Self {
            policy,
            next_delay,
            retries: 0,
        }
    }

    /// Delay to wait before the next retry, or `None` once the retry budget
    /// is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.policy.max_retries {
            if self.retries >= max {
                return None;
            }
        }
        let delay = self.next_delay;
        self.next_delay = self.next_delay.saturating_mul(2);
        self.retries += 1;
        Some(delay)
    }

    /// Consecutive retries since the last success.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn reset(&mut self) {
        self.next_delay = self.policy.base_delay();
        self.retries = 0;
    }
}
