//! Running win statistics for a match sequence.

use serde::{Deserialize, Serialize};

use crate::model::MatchResult;

/// Which agents a [`RunningStatistics`] counts wins for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsScope {
    /// Repeated matches against one opponent: both agents' wins.
    BothAgents,
    /// One match per opponent: agent1's wins only.
    Agent1Only,
}

/// Coarse confidence proxy `1 / sqrt(n)`; `None` before the first game.
pub fn margin_of_error(games_played: u32) -> Option<f64> {
    if games_played == 0 {
        None
    } else {
        Some(1.0 / f64::from(games_played).sqrt())
    }
}

/// Derived, in-memory statistics; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningStatistics {
    pub scope: StatsScope,
    pub games_played: u32,
    /// Wins indexed by agent (0 = agent1, 1 = agent2).
    pub wins: [u32; 2],
}

impl RunningStatistics {
    pub fn new(scope: StatsScope) -> Self {
        Self {
            scope,
            games_played: 0,
            wins: [0, 0],
        }
    }

    /// Count one finished match.
    pub fn record(&mut self, result: &MatchResult) {
        self.games_played += 1;
        if result.won(0) {
            self.wins[0] += 1;
        }
        if self.scope == StatsScope::BothAgents && result.won(1) {
            self.wins[1] += 1;
        }
    }

    /// Wins of agent `index` divided by games played.
    pub fn win_rate(&self, index: usize) -> Option<f64> {
        if self.games_played == 0 {
            return None;
        }
        self.wins
            .get(index)
            .map(|w| f64::from(*w) / f64::from(self.games_played))
    }

    pub fn margin_of_error(&self) -> Option<f64> {
        margin_of_error(self.games_played)
    }
}
