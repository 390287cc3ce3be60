//! Domain records exchanged with the arena API.
//!
//! Wire shapes follow the remote service (camelCase keys). `MatchResult` and
//! `Frame` keep unknown keys so results are written back out unchanged;
//! `LeaderboardEntry` keeps the fields this crate needs and ignores the rest.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};

/// Wire agent id meaning "the submitted code itself".
pub const OWN_CODE_AGENT_ID: i64 = -1;

/// Wire agent id meaning "the boss of the current league".
///
/// Only valid as user input; it is always resolved to a concrete id before
/// a match is requested.
pub const LEAGUE_BOSS_AGENT_ID: i64 = -2;

/// Identity and league room of one puzzle-play session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_handle: String,
    pub public_handle: String,
    pub agent_id: i64,
    pub division_id: i64,
    pub room_index: i64,
}

/// A concrete opponent (or the player's own agent).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opponent {
    pub agent_id: i64,
    pub pseudo: String,
}

impl Opponent {
    pub fn new(agent_id: i64, pseudo: impl Into<String>) -> Self {
        Self {
            agent_id,
            pseudo: pseudo.into(),
        }
    }

    /// The submitted code, played as an agent.
    pub fn own_code() -> Self {
        Self::new(OWN_CODE_AGENT_ID, "")
    }

    /// Placeholder for an id that could not be found on the leaderboard.
    pub fn placeholder(agent_id: i64) -> Self {
        Self::new(agent_id, "")
    }

    pub fn is_own_code(&self) -> bool {
        self.agent_id == OWN_CODE_AGENT_ID
    }

    /// Display label: the pseudo when known, otherwise the agent id.
    pub fn label(&self) -> String {
        if self.is_own_code() {
            "your code".to_string()
        } else if self.pseudo.is_empty() {
            format!("agent {}", self.agent_id)
        } else {
            format!("{} ({})", self.pseudo, self.agent_id)
        }
    }
}

/// A single match-execution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRequest {
    pub code: String,
    pub programming_language_id: String,
    pub agent1_id: i64,
    pub agent2_id: i64,
    /// Pins the match to previously observed conditions when set.
    pub game_options: Option<String>,
}

impl MatchRequest {
    /// Positional payload for the play endpoint.
    pub fn to_payload(&self, session_handle: &str) -> Value {
        json!([
            session_handle,
            {
                "code": self.code,
                "programmingLanguageId": self.programming_language_id,
                "multi": {
                    "agentsIds": [self.agent1_id, self.agent2_id],
                    "gameOptions": self.game_options,
                },
            },
        ])
    }
}

/// One frame of a played game, kept verbatim for artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_information: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyframe: Option<bool>,
    pub agent_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    /// Remote fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome of one remote match. Index 0 is agent1, index 1 is agent2.
///
/// Scores keep their wire representation and unknown keys are carried in
/// `extra`, so serializing a decoded result gives back the remote record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    #[serde(default)]
    pub frames: Vec<Frame>,
    pub game_id: i64,
    #[serde(default)]
    pub referee_input: String,
    pub scores: [Number; 2],
    pub ranks: [i64; 2],
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MatchResult {
    /// Whether agent `index` (0 or 1) finished first.
    pub fn won(&self, index: usize) -> bool {
        self.ranks.get(index).copied() == Some(0)
    }

    pub fn score(&self, index: usize) -> Option<f64> {
        self.scores.get(index).and_then(Number::as_f64)
    }
}

/// League placement attached to a leaderboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct League {
    pub division_index: Option<i64>,
    pub division_count: Option<i64>,
    pub opening_leagues_count: Option<i64>,
    pub division_offset: Option<i64>,
}

/// Read-only projection of a leaderboard row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub agent_id: Option<i64>,
    pub pseudo: Option<String>,
    pub rank: Option<i64>,
    pub local_rank: Option<i64>,
    pub score: Option<f64>,
    pub programming_language: Option<String>,
    pub league: Option<League>,
    pub in_progress: Option<bool>,
}

impl LeaderboardEntry {
    /// Concrete opponent for this row, if the row carries an agent id.
    pub fn to_opponent(&self) -> Option<Opponent> {
        self.agent_id
            .map(|id| Opponent::new(id, self.pseudo.clone().unwrap_or_default()))
    }
}
