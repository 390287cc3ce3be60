//! JSON-over-HTTP transport to the arena services.
//!
//! Every arena operation is a `POST` of a positional JSON array to a fixed
//! path under the services base URL, authenticated by a session cookie.
//! [`ArenaTransport`] is the seam the rest of the crate talks to; the
//! [`HttpTransport`] implementation uses `reqwest`, and tests plug in
//! [`crate::fakes::ScriptedTransport`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ArenaError, ArenaResult};

/// Default base URL of the arena services.
pub const DEFAULT_BASE_URL: &str = "https://www.codingame.com/services";

/// Remote operations used by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    GenerateSession,
    UserRanking,
    StartTestSession,
    FilteredLeaderboard,
    PlayTestSession,
}

impl Endpoint {
    /// Path relative to the base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::GenerateSession => "Puzzle/generateSessionFromPuzzlePrettyId",
            Endpoint::UserRanking => {
                "Leaderboards/getUserArenaDivisionRoomRankingByTestSessionHandle"
            }
            Endpoint::StartTestSession => "TestSession/startTestSession",
            Endpoint::FilteredLeaderboard => "Leaderboards/getFilteredArenaDivisionRoomLeaderboard",
            Endpoint::PlayTestSession => "TestSession/play",
        }
    }
}

/// Error body returned by the arena services.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub id: Option<i64>,
    pub message: Option<String>,
}

/// Failure of a single transport call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {status}")]
    Status {
        status: u16,
        body: Option<ApiErrorBody>,
    },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl TransportError {
    /// The remote service's message when it sent one, otherwise a description.
    pub fn message(&self) -> String {
        match self {
            TransportError::Status {
                body: Some(ApiErrorBody {
                    message: Some(message),
                    ..
                }),
                ..
            } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Numeric error id from the remote error body, if any.
    pub fn api_error_id(&self) -> Option<i64> {
        match self {
            TransportError::Status {
                body: Some(body), ..
            } => body.id,
            _ => None,
        }
    }
}

/// Result type for transport calls.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Injectable arena transport.
#[async_trait]
pub trait ArenaTransport: Send + Sync {
    /// Post `payload` to `endpoint` and return the decoded JSON body.
    async fn call(&self, endpoint: Endpoint, payload: Value) -> TransportResult<Value>;
}

/// `reqwest`-backed transport carrying the session cookie.
pub struct HttpTransport {
    base_url: String,
    cookie: String,
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for `base_url` that sends `cookie` on every call.
    pub fn new(base_url: &str, cookie: &str) -> ArenaResult<Self> {
        Self::build(base_url, cookie, None)
    }

    /// Same as [`HttpTransport::new`] with a per-request timeout.
    pub fn with_timeout(base_url: &str, cookie: &str, timeout: Duration) -> ArenaResult<Self> {
        Self::build(base_url, cookie, Some(timeout))
    }

    fn build(base_url: &str, cookie: &str, timeout: Option<Duration>) -> ArenaResult<Self> {
        let mut builder =
            reqwest::Client::builder().user_agent(concat!("arena-core/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ArenaError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::from_client(base_url, cookie, http_client))
    }

    /// Wrap a preconfigured `reqwest::Client` (proxy, TLS and timeout settings
    /// are the caller's).
    pub fn from_client(base_url: &str, cookie: &str, http_client: reqwest::Client) -> Self {
        HttpTransport {
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie: cookie.to_string(),
            http_client,
        }
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }
}

#[async_trait]
impl ArenaTransport for HttpTransport {
    async fn call(&self, endpoint: Endpoint, payload: Value) -> TransportResult<Value> {
        let url = self.url(endpoint);
        debug!(endpoint = endpoint.path(), "arena request");

        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::COOKIE, &self.cookie)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            let body = serde_json::from_slice::<ApiErrorBody>(&bytes).ok();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
    }
}
