//! In-memory fakes for the transport and match seams (testing only)
//!
//! Provides `ScriptedTransport`, `ScriptedPlayer` and `RecordingObserver`
//! that satisfy the trait contracts without touching the network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::MatchPlayer;
use crate::error::{ArenaError, ArenaResult};
use crate::model::{MatchRequest, MatchResult, SessionContext};
use crate::observer::{MatchProgress, MatchStart, RateLimitNotice, SeriesObserver, SeriesSummary};
use crate::orchestrator::SeriesOutcome;
use crate::transport::{ApiErrorBody, ArenaTransport, Endpoint, TransportError, TransportResult};

/// Session context with fixed, recognisable values.
pub fn sample_context() -> SessionContext {
    SessionContext {
        session_handle: "session-handle".to_string(),
        public_handle: "public-handle".to_string(),
        agent_id: 1000,
        division_id: 3,
        room_index: 1,
    }
}

/// Minimal match result with the given id and ranks.
pub fn match_result(game_id: i64, ranks: [i64; 2]) -> MatchResult {
    MatchResult {
        frames: Vec::new(),
        game_id,
        referee_input: format!("seed={game_id}"),
        scores: [0.into(), 0.into()],
        extra: Default::default(),
        ranks,
    }
}

/// Error body the arena sends when rate limiting.
pub fn rate_limit_error(message: &str) -> TransportError {
    TransportError::Status {
        status: 422,
        body: Some(ApiErrorBody {
            id: Some(crate::client::RATE_LIMIT_ERROR_ID),
            message: Some(message.to_string()),
        }),
    }
}

// ---------------------------------------------------------------------------
// ScriptedTransport
// ---------------------------------------------------------------------------

/// Transport replaying queued responses per endpoint and recording calls.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<HashMap<Endpoint, VecDeque<TransportResult<Value>>>>,
    calls: Mutex<Vec<(Endpoint, Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next call to `endpoint`.
    pub fn push(&self, endpoint: Endpoint, response: TransportResult<Value>) {
        self.responses
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back(response);
    }

    pub fn push_ok(&self, endpoint: Endpoint, body: Value) {
        self.push(endpoint, Ok(body));
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<(Endpoint, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, endpoint: Endpoint) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(e, _)| *e == endpoint)
            .map(|(_, payload)| payload)
            .collect()
    }
}

#[async_trait]
impl ArenaTransport for ScriptedTransport {
    async fn call(&self, endpoint: Endpoint, payload: Value) -> TransportResult<Value> {
        self.calls.lock().unwrap().push((endpoint, payload));
        self.responses
            .lock()
            .unwrap()
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(TransportError::Network(format!(
                    "no scripted response for {}",
                    endpoint.path()
                )))
            })
    }
}

// ---------------------------------------------------------------------------
// ScriptedPlayer
// ---------------------------------------------------------------------------

/// Match player replaying queued outcomes.
///
/// Records each request together with the (tokio) time it was made, so
/// paused-clock tests can assert on backoff waits.
#[derive(Debug, Default)]
pub struct ScriptedPlayer {
    outcomes: Mutex<VecDeque<ArenaResult<MatchResult>>>,
    requests: Mutex<Vec<(tokio::time::Instant, MatchRequest)>>,
}

impl ScriptedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, outcome: ArenaResult<MatchResult>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn push_ok(&self, result: MatchResult) {
        self.push(Ok(result));
    }

    pub fn push_rate_limited(&self, message: &str) {
        self.push(Err(ArenaError::RateLimited(message.to_string())));
    }

    pub fn push_remote_error(&self, message: &str) {
        self.push(Err(ArenaError::RemoteService(message.to_string())));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<MatchRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Time elapsed between consecutive requests.
    pub fn gaps(&self) -> Vec<Duration> {
        let requests = self.requests.lock().unwrap();
        requests
            .windows(2)
            .map(|pair| pair[1].0.duration_since(pair[0].0))
            .collect()
    }
}

#[async_trait]
impl MatchPlayer for ScriptedPlayer {
    async fn play_match(
        &self,
        _context: &SessionContext,
        request: &MatchRequest,
    ) -> ArenaResult<MatchResult> {
        self.requests
            .lock()
            .unwrap()
            .push((tokio::time::Instant::now(), request.clone()));
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ArenaError::RemoteService("script exhausted".to_string())))
    }
}

// ---------------------------------------------------------------------------
// RecordingObserver
// ---------------------------------------------------------------------------

/// Event captured by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum ObservedEvent {
    Started {
        index: usize,
        agent_id: i64,
    },
    Finished {
        index: usize,
        games_played: u32,
        wins: [u32; 2],
        margin_of_error: Option<f64>,
    },
    RateLimited {
        index: usize,
        retry: u32,
        delay: Duration,
    },
    SeriesFinished {
        outcome: SeriesOutcome,
        games_played: u32,
    },
}

/// Observer that stores every event it receives.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Backoff delays announced so far.
    pub fn delays(&self) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::RateLimited { delay, .. } => Some(delay),
                _ => None,
            })
            .collect()
    }
}

impl SeriesObserver for RecordingObserver {
    fn on_match_started(&self, start: &MatchStart<'_>) {
        self.events.lock().unwrap().push(ObservedEvent::Started {
            index: start.index,
            agent_id: start.opponent.agent_id,
        });
    }

    fn on_match_finished(&self, progress: &MatchProgress<'_>) {
        self.events.lock().unwrap().push(ObservedEvent::Finished {
            index: progress.index,
            games_played: progress.statistics.games_played,
            wins: progress.statistics.wins,
            margin_of_error: progress.statistics.margin_of_error(),
        });
    }

    fn on_rate_limited(&self, notice: &RateLimitNotice<'_>) {
        self.events.lock().unwrap().push(ObservedEvent::RateLimited {
            index: notice.index,
            retry: notice.retry,
            delay: notice.delay,
        });
    }

    fn on_series_finished(&self, summary: &SeriesSummary<'_>) {
        self.events.lock().unwrap().push(ObservedEvent::SeriesFinished {
            outcome: summary.outcome,
            games_played: summary.statistics.games_played,
        });
    }
}
