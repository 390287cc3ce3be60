//! Structured observability hooks for session and match lifecycle events.
//!
//! This module provides:
//! - A series-scoped tracing span attached to every match of a sequence
//! - Emission functions for key lifecycle events: session built, match
//!   finished, rate limited, series finished
//!
//! Events are emitted at `info!` level (`warn!` for rate limiting). For JSON
//! output, start the binary with `--json`.

use std::time::Duration;

use tracing::{info, warn};

use crate::model::{MatchResult, Opponent, SessionContext};
use crate::orchestrator::{SeriesMode, SeriesOutcome};
use crate::stats::RunningStatistics;

/// Span tagged with the series mode and planned match count.
///
/// # Example
///
/// ```ignore
/// let span = series_span(SeriesMode::Series, 10);
/// // every event emitted while a match of the series runs carries mode/total
/// ```
pub fn series_span(mode: SeriesMode, total: usize) -> tracing::Span {
    tracing::info_span!("arena.series", mode = %mode, total = total)
}

/// Emit event: session context bootstrapped for a puzzle.
pub fn emit_session_built(puzzle_name: &str, context: &SessionContext) {
    info!(
        event = "session.built",
        puzzle = %puzzle_name,
        public_handle = %context.public_handle,
        agent_id = context.agent_id,
        division_id = context.division_id,
        room_index = context.room_index,
    );
}

/// Emit event: one match finished.
pub fn emit_match_finished(index: usize, total: usize, opponent: &Opponent, result: &MatchResult) {
    info!(
        event = "match.finished",
        index = index,
        total = total,
        opponent_agent_id = opponent.agent_id,
        game_id = result.game_id,
        agent1_won = result.won(0),
    );
}

/// Emit event: rate limited, waiting before retrying (warning level).
pub fn emit_rate_limited(index: usize, retry: u32, delay: Duration, message: &str) {
    warn!(
        event = "match.rate_limited",
        index = index,
        retry = retry,
        delay_ms = delay.as_millis() as u64,
        message = %message,
    );
}

/// Emit event: a series ended, successfully or not.
pub fn emit_series_finished(mode: SeriesMode, outcome: SeriesOutcome, statistics: &RunningStatistics) {
    info!(
        event = "series.finished",
        mode = %mode,
        outcome = %outcome,
        games_played = statistics.games_played,
        agent1_wins = statistics.wins[0],
        agent2_wins = statistics.wins[1],
        margin_of_error = ?statistics.margin_of_error(),
    );
}
