//! Error taxonomy for arena runs.

use std::fmt;

/// Bootstrap step that produced a [`ArenaError::SessionBuild`] failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    /// Exchanging user id and puzzle name for a session handle.
    SessionHandle,
    /// Fetching the caller's public handle and agent id.
    Identity,
    /// Fetching the division id and room index of the league room.
    RoomLookup,
}

impl SessionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStep::SessionHandle => "SESSION_HANDLE",
            SessionStep::Identity => "IDENTITY",
            SessionStep::RoomLookup => "ROOM_LOOKUP",
        }
    }
}

impl fmt::Display for SessionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opponent specifier could not be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("the league room leaderboard is empty")]
    EmptyLeaderboard,

    #[error("no opponent found with a name matching '{keyword}'")]
    NoKeywordMatch { keyword: String },

    #[error("invalid opponent specifier: {0}")]
    InvalidSpecifier(String),
}

/// Errors produced by arena operations.
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("session bootstrap failed at step {step}: {message}")]
    SessionBuild { step: SessionStep, message: String },

    #[error("remote service error: {0}")]
    RemoteService(String),

    #[error("rate limited by remote service: {0}")]
    RateLimited(String),

    #[error("still rate limited after {attempts} attempt(s): {message}")]
    RateLimitExhausted { attempts: u32, message: String },

    #[error("opponent resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("agent id {agent_id} is an unresolved league boss placeholder")]
    UnresolvedOpponent { agent_id: i64 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ArenaError {
    /// Whether the orchestrator should back off and retry.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ArenaError::RateLimited(_))
    }
}

/// Result type for arena operations.
pub type ArenaResult<T> = std::result::Result<T, ArenaError>;
