//! Session bootstrap: the three sequential calls that address a puzzle room.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ArenaError, ArenaResult, SessionStep};
use crate::model::SessionContext;
use crate::obs::emit_session_built;
use crate::transport::{ArenaTransport, Endpoint};

#[derive(Deserialize)]
struct SessionHandleResponse {
    handle: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    codingamer: Option<Codingamer>,
    agent_id: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Codingamer {
    public_handle: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartTestSessionResponse {
    current_question: CurrentQuestion,
}

#[derive(Deserialize)]
struct CurrentQuestion {
    arena: Arena,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Arena {
    arena_codin_gamer: ArenaCodinGamer,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArenaCodinGamer {
    division_id: i64,
    room_index: i64,
}

/// Builds an immutable [`SessionContext`].
///
/// The session cookie lives in the transport. No call is retried: bootstrap
/// is a one-time cost, so rate limiting here is reported to the caller.
pub struct SessionContextBuilder {
    transport: Arc<dyn ArenaTransport>,
}

impl SessionContextBuilder {
    pub fn new(transport: Arc<dyn ArenaTransport>) -> Self {
        Self { transport }
    }

    /// Run the handle, identity and room-lookup calls in order.
    pub async fn build(&self, user_id: i64, puzzle_name: &str) -> ArenaResult<SessionContext> {
        let session_handle = self.session_handle(user_id, puzzle_name).await?;
        let (public_handle, agent_id) = self.identity(&session_handle).await?;
        let (division_id, room_index) = self.room(&session_handle).await?;

        let context = SessionContext {
            session_handle,
            public_handle,
            agent_id,
            division_id,
            room_index,
        };
        emit_session_built(puzzle_name, &context);
        Ok(context)
    }

    async fn session_handle(&self, user_id: i64, puzzle_name: &str) -> ArenaResult<String> {
        let response: SessionHandleResponse = self
            .step(
                SessionStep::SessionHandle,
                Endpoint::GenerateSession,
                json!([user_id, puzzle_name, false]),
            )
            .await?;

        response
            .handle
            .filter(|h| !h.is_empty())
            .ok_or_else(|| missing(SessionStep::SessionHandle, "handle"))
    }

    async fn identity(&self, session_handle: &str) -> ArenaResult<(String, i64)> {
        let response: IdentityResponse = self
            .step(
                SessionStep::Identity,
                Endpoint::UserRanking,
                json!([session_handle, "global"]),
            )
            .await?;

        let public_handle = response
            .codingamer
            .and_then(|c| c.public_handle)
            .ok_or_else(|| missing(SessionStep::Identity, "codingamer.publicHandle"))?;
        let agent_id = response
            .agent_id
            .ok_or_else(|| missing(SessionStep::Identity, "agentId"))?;
        Ok((public_handle, agent_id))
    }

    async fn room(&self, session_handle: &str) -> ArenaResult<(i64, i64)> {
        let response: StartTestSessionResponse = self
            .step(
                SessionStep::RoomLookup,
                Endpoint::StartTestSession,
                json!([session_handle]),
            )
            .await?;

        let room = response.current_question.arena.arena_codin_gamer;
        Ok((room.division_id, room.room_index))
    }

    async fn step<T: DeserializeOwned>(
        &self,
        step: SessionStep,
        endpoint: Endpoint,
        payload: Value,
    ) -> ArenaResult<T> {
        debug!(step = %step, "session bootstrap step");
        let body = self
            .transport
            .call(endpoint, payload)
            .await
            .map_err(|e| ArenaError::SessionBuild {
                step,
                message: e.message(),
            })?;

        serde_json::from_value(body).map_err(|e| ArenaError::SessionBuild {
            step,
            message: format!("malformed response: {e}"),
        })
    }
}

fn missing(step: SessionStep, field: &str) -> ArenaError {
    ArenaError::SessionBuild {
        step,
        message: format!("response is missing {field}"),
    }
}
