//! Opponent resolution: symbolic specifiers and filter choices to concrete
//! [`Opponent`]s.
//!
//! All forms share the same leaderboard query. A call to
//! [`OpponentResolver::resolve`] fetches the room leaderboard at most once,
//! and only when a specifier needs it.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{ArenaResult, ResolutionError};
use crate::leaderboard::{LeaderboardClient, LeaderboardColumn, LeaderboardFilter, LeaderboardQuery};
use crate::model::{LeaderboardEntry, Opponent, LEAGUE_BOSS_AGENT_ID, OWN_CODE_AGENT_ID};

/// Number of leaderboard rows taken by the "top 10" forms.
pub const TOP_SLICE: usize = 10;

/// Caller-facing opponent specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpponentSpec {
    /// The submitted code itself.
    OwnCode,
    /// The first-ranked agent of the current league room.
    LeagueBoss,
    /// A specific agent id.
    Agent(i64),
    /// The first ten rows of the room leaderboard.
    Top10,
}

impl OpponentSpec {
    fn needs_leaderboard(&self) -> bool {
        !matches!(self, OpponentSpec::OwnCode)
    }
}

/// Numeric ids as found in the config file. Only `-1`, `-2` and positive
/// agent ids are meaningful.
impl TryFrom<i64> for OpponentSpec {
    type Error = ResolutionError;

    fn try_from(agent_id: i64) -> Result<Self, Self::Error> {
        match agent_id {
            OWN_CODE_AGENT_ID => Ok(OpponentSpec::OwnCode),
            LEAGUE_BOSS_AGENT_ID => Ok(OpponentSpec::LeagueBoss),
            id if id > 0 => Ok(OpponentSpec::Agent(id)),
            id => Err(ResolutionError::InvalidSpecifier(id.to_string())),
        }
    }
}

impl FromStr for OpponentSpec {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("top10") {
            return Ok(OpponentSpec::Top10);
        }
        s.parse::<i64>()
            .ok()
            .and_then(|id| OpponentSpec::try_from(id).ok())
            .ok_or_else(|| ResolutionError::InvalidSpecifier(s.to_string()))
    }
}

impl fmt::Display for OpponentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpponentSpec::OwnCode => write!(f, "{OWN_CODE_AGENT_ID}"),
            OpponentSpec::LeagueBoss => write!(f, "{LEAGUE_BOSS_AGENT_ID}"),
            OpponentSpec::Agent(id) => write!(f, "{id}"),
            OpponentSpec::Top10 => f.write_str("top10"),
        }
    }
}

/// Human-facing opponent search choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpponentFilter {
    /// Players ranked close to the caller.
    SimilarRank,
    /// Players the caller follows.
    Following,
    /// The top of the caller's league room.
    LeagueTop10,
    /// Players whose name contains the keyword.
    Keyword(String),
}

impl OpponentFilter {
    /// Leaderboard query backing this choice.
    pub fn query(&self) -> LeaderboardQuery {
        match self {
            OpponentFilter::SimilarRank => {
                LeaderboardQuery::active(LeaderboardColumn::Codingamer, LeaderboardFilter::Around)
            }
            OpponentFilter::Following => LeaderboardQuery::active(
                LeaderboardColumn::Codingamer,
                LeaderboardFilter::Following,
            ),
            OpponentFilter::LeagueTop10 => {
                LeaderboardQuery::active(LeaderboardColumn::Codingamer, LeaderboardFilter::All)
            }
            OpponentFilter::Keyword(keyword) => LeaderboardQuery::active(
                LeaderboardColumn::Keyword,
                LeaderboardFilter::Keyword(keyword.clone()),
            ),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OpponentFilter::SimilarRank => "have a similar rank as mine",
            OpponentFilter::Following => "I follow",
            OpponentFilter::LeagueTop10 => "are in the Top 10 of my league",
            OpponentFilter::Keyword(_) => "have a specific name",
        }
    }
}

/// Resolves specifiers against the session's league room.
pub struct OpponentResolver {
    leaderboard: LeaderboardClient,
}

impl OpponentResolver {
    pub fn new(leaderboard: LeaderboardClient) -> Self {
        Self { leaderboard }
    }

    /// Resolve a list of specifiers, preserving order; `Top10` expands in place.
    pub async fn resolve(&self, specs: &[OpponentSpec]) -> ArenaResult<Vec<Opponent>> {
        let entries = if specs.iter().any(OpponentSpec::needs_leaderboard) {
            self.leaderboard.fetch(&LeaderboardQuery::all()).await?
        } else {
            Vec::new()
        };

        let mut opponents = Vec::with_capacity(specs.len());
        for spec in specs {
            match spec {
                OpponentSpec::OwnCode => opponents.push(Opponent::own_code()),
                OpponentSpec::LeagueBoss => opponents.push(league_boss(&entries)?),
                OpponentSpec::Agent(id) => opponents.push(find_agent(&entries, *id)),
                OpponentSpec::Top10 => {
                    let top = top_slice(&entries);
                    if top.is_empty() {
                        return Err(ResolutionError::EmptyLeaderboard.into());
                    }
                    opponents.extend(top);
                }
            }
        }
        debug!(count = opponents.len(), "resolved opponents");
        Ok(opponents)
    }

    /// Resolve a single specifier that must name exactly one agent.
    pub async fn resolve_one(&self, spec: OpponentSpec) -> ArenaResult<Opponent> {
        if spec == OpponentSpec::Top10 {
            return Err(ResolutionError::InvalidSpecifier(
                "top10 names more than one agent".to_string(),
            )
            .into());
        }
        let mut resolved = self.resolve(&[spec]).await?;
        resolved
            .pop()
            .ok_or_else(|| ResolutionError::InvalidSpecifier(spec.to_string()).into())
    }

    /// Opponents matching a search choice, in leaderboard order.
    ///
    /// A keyword search with no match fails with
    /// [`ResolutionError::NoKeywordMatch`] so the caller can ask again.
    pub async fn search(&self, filter: &OpponentFilter) -> ArenaResult<Vec<Opponent>> {
        if let OpponentFilter::Keyword(keyword) = filter {
            if keyword.trim().is_empty() {
                return Err(
                    ResolutionError::InvalidSpecifier("empty keyword".to_string()).into(),
                );
            }
        }

        let entries = self.leaderboard.fetch(&filter.query()).await?;
        let opponents: Vec<Opponent> = match filter {
            OpponentFilter::LeagueTop10 => top_slice(&entries),
            _ => entries.iter().filter_map(LeaderboardEntry::to_opponent).collect(),
        };

        if let OpponentFilter::Keyword(keyword) = filter {
            if opponents.is_empty() {
                return Err(ResolutionError::NoKeywordMatch {
                    keyword: keyword.clone(),
                }
                .into());
            }
        }
        Ok(opponents)
    }
}

/// Row with the lowest rank; the first row when no rank is reported.
fn league_boss(entries: &[LeaderboardEntry]) -> ArenaResult<Opponent> {
    entries
        .iter()
        .filter(|e| e.agent_id.is_some())
        .min_by_key(|e| e.rank.unwrap_or(i64::MAX))
        .and_then(LeaderboardEntry::to_opponent)
        .ok_or_else(|| ResolutionError::EmptyLeaderboard.into())
}

fn find_agent(entries: &[LeaderboardEntry], agent_id: i64) -> Opponent {
    entries
        .iter()
        .find(|e| e.agent_id == Some(agent_id))
        .and_then(LeaderboardEntry::to_opponent)
        .unwrap_or_else(|| {
            warn!(agent_id, "agent not found on leaderboard, using placeholder");
            Opponent::placeholder(agent_id)
        })
}

fn top_slice(entries: &[LeaderboardEntry]) -> Vec<Opponent> {
    entries
        .iter()
        .take(TOP_SLICE)
        .filter_map(LeaderboardEntry::to_opponent)
        .collect()
}
