//! Filtered views of the current league room leaderboard.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::json;

use crate::error::{ArenaError, ArenaResult};
use crate::model::{LeaderboardEntry, SessionContext};
use crate::transport::{ArenaTransport, Endpoint};

/// Leaderboard column a filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaderboardColumn {
    #[default]
    Codingamer,
    Language,
    Score,
    Country,
    Keyword,
}

/// Filter value; `Keyword` carries a free-form name substring.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LeaderboardFilter {
    #[default]
    All,
    Same,
    Finished,
    InProgress,
    Around,
    Following,
    Online,
    Keyword(String),
}

impl LeaderboardFilter {
    pub fn as_str(&self) -> &str {
        match self {
            LeaderboardFilter::All => "ALL",
            LeaderboardFilter::Same => "SAME",
            LeaderboardFilter::Finished => "FINISHED",
            LeaderboardFilter::InProgress => "INPROGRESS",
            LeaderboardFilter::Around => "AROUND",
            LeaderboardFilter::Following => "FOLLOWING",
            LeaderboardFilter::Online => "ONLINE",
            LeaderboardFilter::Keyword(keyword) => keyword,
        }
    }
}

impl fmt::Display for LeaderboardFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LeaderboardFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Query options sent as the last element of the leaderboard payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LeaderboardQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    pub column: LeaderboardColumn,
    pub filter: LeaderboardFilter,
}

impl LeaderboardQuery {
    /// Unfiltered room leaderboard.
    pub fn all() -> Self {
        Self::default()
    }

    /// Active players only, filtered on `column`.
    pub fn active(column: LeaderboardColumn, filter: LeaderboardFilter) -> Self {
        Self {
            active: Some(true),
            column,
            filter,
        }
    }
}

#[derive(Deserialize)]
struct LeaderboardResponse {
    users: Option<Vec<LeaderboardEntry>>,
}

/// Read-only leaderboard access for one session's league room.
#[derive(Clone)]
pub struct LeaderboardClient {
    transport: Arc<dyn ArenaTransport>,
    context: Arc<SessionContext>,
}

impl LeaderboardClient {
    pub fn new(transport: Arc<dyn ArenaTransport>, context: Arc<SessionContext>) -> Self {
        Self { transport, context }
    }

    /// Fetch the room leaderboard rows matching `query`, in leaderboard order.
    pub async fn fetch(&self, query: &LeaderboardQuery) -> ArenaResult<Vec<LeaderboardEntry>> {
        let payload = json!([
            {
                "divisionId": self.context.division_id,
                "roomIndex": self.context.room_index,
            },
            self.context.public_handle,
            null,
            query,
        ]);

        let body = self
            .transport
            .call(Endpoint::FilteredLeaderboard, payload)
            .await
            .map_err(|e| {
                ArenaError::RemoteService(format!(
                    "there was a problem fetching users: {}",
                    e.message()
                ))
            })?;

        let response: LeaderboardResponse = serde_json::from_value(body).map_err(|e| {
            ArenaError::RemoteService(format!("malformed leaderboard response: {e}"))
        })?;

        response.users.ok_or_else(|| {
            ArenaError::RemoteService("leaderboard response carried no users".to_string())
        })
    }
}
