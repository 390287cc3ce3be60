//! Global atomic counters for arena runs.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a run).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters. No allocations and no locking.
pub struct Metrics {
    matches_played: AtomicU64,
    rate_limited: AtomicU64,
    backoff_ms: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            matches_played: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            backoff_ms: AtomicU64::new(0),
        }
    }

    /// Increment the matches-played counter by one.
    pub fn inc_matches_played(&self) {
        self.matches_played.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "matches_played", "counter incremented");
    }

    /// Increment the rate-limited counter by one.
    pub fn inc_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "rate_limited", "counter incremented");
    }

    /// Add a backoff wait to the total time spent waiting.
    pub fn add_backoff(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.backoff_ms.fetch_add(ms, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a run) rather than on every
    /// increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            matches_played = self.matches_played(),
            rate_limited = self.rate_limited(),
            backoff_ms = self.backoff_ms(),
        );
    }

    pub fn matches_played(&self) -> u64 {
        self.matches_played.load(Ordering::Relaxed)
    }

    pub fn rate_limited(&self) -> u64 {
        self.rate_limited.load(Ordering::Relaxed)
    }

    pub fn backoff_ms(&self) -> u64 {
        self.backoff_ms.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.matches_played.store(0, Ordering::Relaxed);
        self.rate_limited.store(0, Ordering::Relaxed);
        self.backoff_ms.store(0, Ordering::Relaxed);
    }
}
