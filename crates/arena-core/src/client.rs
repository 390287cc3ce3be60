//! Single remote match execution and failure classification.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ArenaError, ArenaResult};
use crate::model::{MatchRequest, MatchResult, SessionContext};
use crate::transport::{ApiErrorBody, ArenaTransport, Endpoint, TransportError};

/// Error id the arena uses to signal rate limiting on the play endpoint.
pub const RATE_LIMIT_ERROR_ID: i64 = 407;

/// Plays exactly one match per call.
///
/// Implementations must report rate limiting as [`ArenaError::RateLimited`]
/// and every other failure as [`ArenaError::RemoteService`]; the
/// orchestrator retries on the former only.
#[async_trait]
pub trait MatchPlayer: Send + Sync {
    async fn play_match(
        &self,
        context: &SessionContext,
        request: &MatchRequest,
    ) -> ArenaResult<MatchResult>;
}

/// [`MatchPlayer`] backed by the arena play endpoint.
pub struct RemoteMatchClient {
    transport: Arc<dyn ArenaTransport>,
}

impl RemoteMatchClient {
    pub fn new(transport: Arc<dyn ArenaTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl MatchPlayer for RemoteMatchClient {
    async fn play_match(
        &self,
        context: &SessionContext,
        request: &MatchRequest,
    ) -> ArenaResult<MatchResult> {
        let body = self
            .transport
            .call(
                Endpoint::PlayTestSession,
                request.to_payload(&context.session_handle),
            )
            .await
            .map_err(|e| classify_failure(&e))?;

        decode_match_result(body)
    }
}

/// Map a transport failure onto the retry/abort taxonomy.
pub fn classify_failure(error: &TransportError) -> ArenaError {
    if error.api_error_id() == Some(RATE_LIMIT_ERROR_ID) {
        ArenaError::RateLimited(error.message())
    } else {
        ArenaError::RemoteService(format!(
            "there was a problem running your match: {}",
            error.message()
        ))
    }
}

/// Decode a 2xx play body; error-shaped bodies are classified like HTTP errors.
fn decode_match_result(body: Value) -> ArenaResult<MatchResult> {
    match serde_json::from_value::<MatchResult>(body.clone()) {
        Ok(result) => Ok(result),
        Err(decode_err) => match serde_json::from_value::<ApiErrorBody>(body) {
            Ok(api_err) if api_err.id.is_some() => Err(classify_failure(&TransportError::Status {
                status: 200,
                body: Some(api_err),
            })),
            _ => Err(ArenaError::RemoteService(format!(
                "malformed match result: {decode_err}"
            ))),
        },
    }
}
