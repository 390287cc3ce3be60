//! Log setup for the `arena` binary.
//!
//! The CLI prints one progress line per match and, under `--json`, a final
//! summary object on stdout. Scripts parse that stream, so every log line
//! goes to stderr instead. Calling [`init_tracing`] again is a no-op.
//!
//! Filter precedence: `ARENA_LOG`, then `RUST_LOG`, then
//! [`default_directives`] for the requested level.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter variable scoped to this tool; wins over `RUST_LOG`.
pub const LOG_ENV: &str = "ARENA_LOG";

/// HTTP stack targets that flood the log at debug level during long series.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Directives used when neither `ARENA_LOG` nor `RUST_LOG` is set.
///
/// `level` applies to the arena crates; the HTTP stack stays at `warn`
/// unless `level` is `trace`.
pub fn default_directives(level: Level) -> String {
    let mut directives = vec![level.as_str().to_ascii_lowercase()];
    if level != Level::TRACE {
        directives.extend(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")));
    }
    directives.join(",")
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber, writing to stderr. `json` switches to one
/// JSON object per log line, matching the `--json` summary on stdout.
pub fn init_tracing(json: bool, level: Level) {
    let filter = env_filter(level);
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()
            .ok();
    }
}
