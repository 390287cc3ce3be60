//! Arena Core Library
//!
//! Drives matches between bot programs on the remote arena: session
//! bootstrap, single-match execution, opponent resolution and sequenced
//! match series with statistics and rate-limit backoff.

pub mod artifacts;
pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod fakes;
pub mod leaderboard;
pub mod metrics;
pub mod model;
pub mod obs;
pub mod observer;
pub mod orchestrator;
pub mod resolver;
pub mod session;
pub mod stats;
pub mod telemetry;
pub mod transport;

pub use artifacts::{read_cached_game_options, MatchArtifactWriter, CACHED_GAME_OPTIONS_FILE};
pub use backoff::{Backoff, BackoffPolicy};
pub use client::{classify_failure, MatchPlayer, RemoteMatchClient, RATE_LIMIT_ERROR_ID};
pub use config::{ArenaConfig, DEFAULT_CONFIG_PATH, DEFAULT_OUTPUT_DIR};
pub use error::{ArenaError, ArenaResult, ResolutionError, SessionStep};
pub use leaderboard::{LeaderboardClient, LeaderboardColumn, LeaderboardFilter, LeaderboardQuery};
pub use model::{
    Frame, LeaderboardEntry, League, MatchRequest, MatchResult, Opponent, SessionContext,
    LEAGUE_BOSS_AGENT_ID, OWN_CODE_AGENT_ID,
};
pub use observer::{
    MatchProgress, MatchStart, NoopObserver, RateLimitNotice, SeriesObserver, SeriesSummary,
    TracingObserver,
};
pub use orchestrator::{MatchOrchestrator, MatchSeries, MatchSetup, SeriesMode, SeriesOutcome};
pub use resolver::{OpponentFilter, OpponentResolver, OpponentSpec, TOP_SLICE};
pub use session::SessionContextBuilder;
pub use stats::{margin_of_error, RunningStatistics, StatsScope};
pub use transport::{
    ApiErrorBody, ArenaTransport, Endpoint, HttpTransport, TransportError, TransportResult,
    DEFAULT_BASE_URL,
};

/// Arena core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
