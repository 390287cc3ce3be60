//! Match orchestration: sequential match series with statistics and
//! rate-limit backoff.
//!
//! [`MatchOrchestrator`] hands out [`MatchSeries`], a lazy, forward-only
//! sequence of match results. Each call to [`MatchSeries::next`] plays exactly
//! one match; nothing runs ahead of the caller and no two requests are ever
//! in flight at once.

use std::fmt;
use std::sync::Arc;

use futures::Stream;
use tracing::Instrument;

use crate::backoff::{Backoff, BackoffPolicy};
use crate::client::MatchPlayer;
use crate::error::{ArenaError, ArenaResult};
use crate::metrics::METRICS;
use crate::model::{MatchRequest, MatchResult, Opponent, SessionContext, LEAGUE_BOSS_AGENT_ID};
use crate::obs::{emit_match_finished, emit_rate_limited, emit_series_finished, series_span};
use crate::observer::{
    MatchProgress, MatchStart, NoopObserver, RateLimitNotice, SeriesObserver, SeriesSummary,
};
use crate::stats::{RunningStatistics, StatsScope};

/// Everything about agent1 that stays fixed for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSetup {
    pub code: String,
    pub programming_language_id: String,
    pub agent1: Opponent,
    /// Replay conditions; `None` lets the arena randomize.
    pub game_options: Option<String>,
}

impl MatchSetup {
    fn request_against(&self, opponent: &Opponent) -> MatchRequest {
        MatchRequest {
            code: self.code.clone(),
            programming_language_id: self.programming_language_id.clone(),
            agent1_id: self.agent1.agent_id,
            agent2_id: opponent.agent_id,
            game_options: self.game_options.clone(),
        }
    }
}

/// How a [`MatchSeries`] was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesMode {
    /// Repeated matches against one opponent.
    Series,
    /// One match per opponent, in list order.
    RoundRobin,
}

impl SeriesMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesMode::Series => "series",
            SeriesMode::RoundRobin => "round_robin",
        }
    }

    fn scope(&self) -> StatsScope {
        match self {
            SeriesMode::Series => StatsScope::BothAgents,
            SeriesMode::RoundRobin => StatsScope::Agent1Only,
        }
    }
}

impl fmt::Display for SeriesMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a [`MatchSeries`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesOutcome {
    /// Every scheduled match was played.
    Completed,
    /// A match failed with an error other than a rate limit.
    Failed,
    /// The retry ceiling was spent while rate limited.
    RateLimitExhausted,
}

impl SeriesOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesOutcome::Completed => "completed",
            SeriesOutcome::Failed => "failed",
            SeriesOutcome::RateLimitExhausted => "rate_limit_exhausted",
        }
    }
}

impl fmt::Display for SeriesOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
enum Schedule {
    Repeat { opponent: Opponent, count: usize },
    Each(Vec<Opponent>),
}

impl Schedule {
    fn len(&self) -> usize {
        match self {
            Schedule::Repeat { count, .. } => *count,
            Schedule::Each(opponents) => opponents.len(),
        }
    }

    fn get(&self, position: usize) -> Option<&Opponent> {
        match self {
            Schedule::Repeat { opponent, count } if position < *count => Some(opponent),
            Schedule::Repeat { .. } => None,
            Schedule::Each(opponents) => opponents.get(position),
        }
    }

    fn opponents(&self) -> Box<dyn Iterator<Item = &Opponent> + '_> {
        match self {
            Schedule::Repeat { opponent, .. } => Box::new(std::iter::once(opponent)),
            Schedule::Each(opponents) => Box::new(opponents.iter()),
        }
    }
}

/// Builds match sequences for one session and one submitted program.
pub struct MatchOrchestrator {
    player: Arc<dyn MatchPlayer>,
    context: Arc<SessionContext>,
    setup: Arc<MatchSetup>,
    policy: BackoffPolicy,
    observer: Arc<dyn SeriesObserver>,
}

impl MatchOrchestrator {
    pub fn new(
        player: Arc<dyn MatchPlayer>,
        context: Arc<SessionContext>,
        setup: MatchSetup,
    ) -> Self {
        Self {
            player,
            context,
            setup: Arc::new(setup),
            policy: BackoffPolicy::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_backoff(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SeriesObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// `count` matches against the same opponent.
    pub fn play_series(&self, opponent: Opponent, count: usize) -> ArenaResult<MatchSeries> {
        self.series(SeriesMode::Series, Schedule::Repeat { opponent, count })
    }

    /// One match against each opponent, in order.
    pub fn play_round_robin(&self, opponents: Vec<Opponent>) -> ArenaResult<MatchSeries> {
        self.series(SeriesMode::RoundRobin, Schedule::Each(opponents))
    }

    fn series(&self, mode: SeriesMode, schedule: Schedule) -> ArenaResult<MatchSeries> {
        ensure_resolved(&self.setup.agent1)?;
        for opponent in schedule.opponents() {
            ensure_resolved(opponent)?;
        }

        let span = series_span(mode, schedule.len());
        Ok(MatchSeries {
            player: Arc::clone(&self.player),
            context: Arc::clone(&self.context),
            setup: Arc::clone(&self.setup),
            observer: Arc::clone(&self.observer),
            mode,
            schedule,
            position: 0,
            backoff: Backoff::new(self.policy.clone()),
            statistics: RunningStatistics::new(mode.scope()),
            outcome: None,
            span,
        })
    }
}

fn ensure_resolved(opponent: &Opponent) -> ArenaResult<()> {
    if opponent.agent_id == LEAGUE_BOSS_AGENT_ID {
        return Err(ArenaError::UnresolvedOpponent {
            agent_id: opponent.agent_id,
        });
    }
    Ok(())
}

/// Lazy, forward-only sequence of match results.
///
/// Yields results in request order. After the last match, or after the
/// first error, [`MatchSeries::next`] returns `None` forever.
pub struct MatchSeries {
    player: Arc<dyn MatchPlayer>,
    context: Arc<SessionContext>,
    setup: Arc<MatchSetup>,
    observer: Arc<dyn SeriesObserver>,
    mode: SeriesMode,
    schedule: Schedule,
    position: usize,
    backoff: Backoff,
    statistics: RunningStatistics,
    outcome: Option<SeriesOutcome>,
    span: tracing::Span,
}

impl MatchSeries {
    pub fn mode(&self) -> SeriesMode {
        self.mode
    }

    /// Number of matches the sequence will request.
    pub fn total(&self) -> usize {
        self.schedule.len()
    }

    /// Matches completed so far.
    pub fn completed(&self) -> usize {
        self.position
    }

    pub fn statistics(&self) -> &RunningStatistics {
        &self.statistics
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// How the sequence ended; `None` while matches remain.
    pub fn outcome(&self) -> Option<SeriesOutcome> {
        self.outcome
    }

    fn finish(&mut self, outcome: SeriesOutcome) {
        self.outcome = Some(outcome);
        emit_series_finished(self.mode, outcome, &self.statistics);
        self.observer.on_series_finished(&SeriesSummary {
            mode: self.mode,
            outcome,
            statistics: &self.statistics,
        });
    }

    /// Play the next match, waiting out rate limits as needed.
    pub async fn next(&mut self) -> Option<ArenaResult<MatchResult>> {
        let span = self.span.clone();
        self.advance().instrument(span).await
    }

    async fn advance(&mut self) -> Option<ArenaResult<MatchResult>> {
        if self.is_finished() {
            return None;
        }

        let total = self.schedule.len();
        let Some(opponent) = self.schedule.get(self.position).cloned() else {
            self.finish(SeriesOutcome::Completed);
            return None;
        };
        let index = self.position + 1;
        let request = self.setup.request_against(&opponent);

        self.observer.on_match_started(&MatchStart {
            index,
            total,
            opponent: &opponent,
        });

        loop {
            match self.player.play_match(&self.context, &request).await {
                Ok(result) => {
                    self.backoff.reset();
                    self.position += 1;
                    self.statistics.record(&result);
                    METRICS.inc_matches_played();
                    emit_match_finished(index, total, &opponent, &result);
                    self.observer.on_match_finished(&MatchProgress {
                        index,
                        total,
                        opponent: &opponent,
                        result: &result,
                        statistics: &self.statistics,
                    });
                    return Some(Ok(result));
                }
                Err(ArenaError::RateLimited(message)) => {
                    METRICS.inc_rate_limited();
                    let Some(delay) = self.backoff.next_delay() else {
                        self.finish(SeriesOutcome::RateLimitExhausted);
                        return Some(Err(ArenaError::RateLimitExhausted {
                            attempts: self.backoff.retries() + 1,
                            message,
                        }));
                    };
                    let retry = self.backoff.retries();
                    emit_rate_limited(index, retry, delay, &message);
                    self.observer.on_rate_limited(&RateLimitNotice {
                        index,
                        opponent: &opponent,
                        retry,
                        delay,
                        message: &message,
                    });
                    METRICS.add_backoff(delay);
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    self.finish(SeriesOutcome::Failed);
                    return Some(Err(err));
                }
            }
        }
    }

    /// Drive the remaining matches, stopping at the first error.
    pub async fn collect_results(mut self) -> ArenaResult<Vec<MatchResult>> {
        let mut results = Vec::with_capacity(self.total() - self.completed());
        while let Some(item) = self.next().await {
            results.push(item?);
        }
        Ok(results)
    }

    /// Adapt the sequence into a `futures::Stream`.
    pub fn into_stream(self) -> impl Stream<Item = ArenaResult<MatchResult>> {
        futures::stream::unfold(self, |mut series| async move {
            series.next().await.map(|item| (item, series))
        })
    }
}
