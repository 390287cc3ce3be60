//! Progress reporting hooks for match sequences.
//!
//! The orchestrator calls a [`SeriesObserver`] as matches start, finish and
//! hit rate limits, and once more when the sequence ends. Rendering (progress bars, console lines) lives with the
//! caller.

use std::time::Duration;

use tracing::{info, warn};

use crate::model::{MatchResult, Opponent};
use crate::orchestrator::{SeriesMode, SeriesOutcome};
use crate::stats::{RunningStatistics, StatsScope};

/// A match is about to be requested.
#[derive(Debug, Clone)]
pub struct MatchStart<'a> {
    /// 1-based index of the match in the sequence.
    pub index: usize,
    pub total: usize,
    pub opponent: &'a Opponent,
}

/// A match finished and statistics were updated.
#[derive(Debug, Clone)]
pub struct MatchProgress<'a> {
    pub index: usize,
    pub total: usize,
    pub opponent: &'a Opponent,
    pub result: &'a MatchResult,
    pub statistics: &'a RunningStatistics,
}

impl MatchProgress<'_> {
    pub fn agent1_won(&self) -> bool {
        self.result.won(0)
    }
}

/// A request was rate limited; the orchestrator is about to wait.
#[derive(Debug, Clone)]
pub struct RateLimitNotice<'a> {
    pub index: usize,
    pub opponent: &'a Opponent,
    /// Consecutive rate-limit retries for this match, including this one.
    pub retry: u32,
    pub delay: Duration,
    pub message: &'a str,
}

/// The sequence ended. Sent exactly once, including after an error.
#[derive(Debug, Clone)]
pub struct SeriesSummary<'a> {
    pub mode: SeriesMode,
    pub outcome: SeriesOutcome,
    pub statistics: &'a RunningStatistics,
}

/// Receives sequence progress. Every method defaults to a no-op.
pub trait SeriesObserver: Send + Sync {
    fn on_match_started(&self, _start: &MatchStart<'_>) {}

    fn on_match_finished(&self, _progress: &MatchProgress<'_>) {}

    fn on_rate_limited(&self, _notice: &RateLimitNotice<'_>) {}

    fn on_series_finished(&self, _summary: &SeriesSummary<'_>) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SeriesObserver for NoopObserver {}

/// Observer that reports progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SeriesObserver for TracingObserver {
    fn on_match_finished(&self, progress: &MatchProgress<'_>) {
        let stats = progress.statistics;
        let agent2_wins = match stats.scope {
            StatsScope::BothAgents => Some(stats.wins[1]),
            StatsScope::Agent1Only => None,
        };
        info!(
            index = progress.index,
            total = progress.total,
            opponent = %progress.opponent.label(),
            game_id = progress.result.game_id,
            agent1_wins = stats.wins[0],
            agent2_wins = ?agent2_wins,
            win_rate = ?stats.win_rate(0),
            margin_of_error = ?stats.margin_of_error(),
            "match finished"
        );
    }

    fn on_rate_limited(&self, notice: &RateLimitNotice<'_>) {
        warn!(
            index = notice.index,
            retry = notice.retry,
            delay_ms = notice.delay.as_millis() as u64,
            message = notice.message,
            "rate limited, backing off"
        );
    }
}
