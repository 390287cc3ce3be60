//! Arena CLI - play bot matches on the remote arena
//!
//! The `arena` command bootstraps a test session for a puzzle, resolves the
//! requested opponents and plays matches one at a time, waiting out rate
//! limits.
//!
//! ## Commands
//!
//! - `play`: play a series against one opponent, or one match per opponent

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn, Level};

use arena_core::metrics::METRICS;
use arena_core::telemetry::init_tracing;
use arena_core::{
    read_cached_game_options, ArenaConfig, ArenaTransport, HttpTransport, LeaderboardClient,
    MatchArtifactWriter, MatchOrchestrator, MatchProgress, MatchSetup, Opponent, OpponentFilter,
    OpponentResolver, OpponentSpec, RateLimitNotice, RemoteMatchClient, SeriesObserver,
    SessionContextBuilder, StatsScope, TracingObserver, DEFAULT_CONFIG_PATH,
};

#[derive(Parser)]
#[command(name = "arena")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Play bot matches on the remote arena", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and a JSON summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play matches between two bots
    Play(PlayArgs),
}

#[derive(Args, Debug, Clone)]
struct PlayArgs {
    /// Number of matches to play against a single opponent
    #[arg(default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    count: u32,

    /// Path to config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Agent 1: an agent id, -1 for your own code, -2 for the league boss
    #[arg(long, allow_hyphen_values = true)]
    agent1: Option<OpponentSpec>,

    /// Agent 2 (repeatable): an agent id, -1, -2 or `top10`
    #[arg(long, allow_hyphen_values = true, conflicts_with_all = ["top10", "filter"])]
    agent2: Vec<OpponentSpec>,

    /// Path to the file containing the code to submit
    #[arg(short, long)]
    code: Option<PathBuf>,

    /// Programming language of the submitted code
    #[arg(short, long)]
    language: Option<String>,

    /// Puzzle or contest name
    #[arg(short, long)]
    puzzle: Option<String>,

    /// Write every match result to the output directory
    #[arg(short, long)]
    output: bool,

    /// Output directory (created if missing)
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// Reuse the game conditions of the last played match
    #[arg(short, long)]
    replay: bool,

    /// Play agent 1 against the top 10 of the league room
    #[arg(long, conflicts_with = "filter")]
    top10: bool,

    /// Pick opponents with a leaderboard search
    #[arg(long, value_enum)]
    filter: Option<FilterChoice>,

    /// Name fragment for `--filter keyword`
    #[arg(long, required_if_eq("filter", "keyword"))]
    keyword: Option<String>,

    /// Give up after this many consecutive rate-limit retries
    #[arg(long)]
    max_retries: Option<u32>,
}

impl PlayArgs {
    /// Command-line values take precedence over the config file.
    fn apply_to(&self, config: &mut ArenaConfig) {
        if let Some(puzzle) = &self.puzzle {
            config.puzzle_name = Some(puzzle.clone());
        }
        if let Some(code) = &self.code {
            config.code_path = Some(code.clone());
        }
        if let Some(language) = &self.language {
            config.programming_language_id = Some(language.clone());
        }
        if let Some(outdir) = &self.outdir {
            config.output_dir = Some(outdir.clone());
        }
        if let Some(max_retries) = self.max_retries {
            config.backoff.max_retries = Some(max_retries);
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum FilterChoice {
    /// Players with a rank similar to yours
    SimilarRank,
    /// Players you follow
    Following,
    /// The top 10 of your league room
    Top10,
    /// Players whose name contains `--keyword`
    Keyword,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Play(args) => cmd_play(args, cli.json).await,
    }
}

async fn cmd_play(args: PlayArgs, json: bool) -> Result<()> {
    let mut config = ArenaConfig::load(&args.config)?;
    args.apply_to(&mut config);
    config.validate()?;

    let user_id = config.user_id.context("No user id was specified")?;
    let puzzle = config
        .puzzle_name
        .clone()
        .context("No puzzle name was specified")?;
    let language = config
        .programming_language_id
        .clone()
        .context("No programming language was specified")?;
    let code_path = config
        .code_path
        .clone()
        .context("No code path was specified")?;
    let outdir = config.output_dir();

    let transport = build_transport(&config)?;
    let context = SessionContextBuilder::new(Arc::clone(&transport))
        .build(user_id, &puzzle)
        .await
        .context("Failed to start a test session")?;
    let context = Arc::new(context);
    info!(puzzle = %puzzle, agent_id = context.agent_id, "test session ready");

    let code = read_code(&code_path)?;
    let game_options = if args.replay {
        let options = read_cached_game_options(&outdir).with_context(|| {
            format!(
                "Failed to read cached game options from {}",
                outdir.display()
            )
        })?;
        Some(options)
    } else {
        None
    };

    let resolver = OpponentResolver::new(LeaderboardClient::new(
        Arc::clone(&transport),
        Arc::clone(&context),
    ));
    let agent1_spec = agent1_spec(args.agent1, config.agent1)?;
    let agent1 = resolver
        .resolve_one(agent1_spec)
        .await
        .context("Failed to resolve agent 1")?;
    let opponents = requested_opponents(&resolver, &args, &config.agent2).await?;
    if opponents.is_empty() {
        bail!("No opponent matched the request");
    }

    let setup = MatchSetup {
        code,
        programming_language_id: language,
        agent1,
        game_options,
    };
    // JSON runs report progress as log events instead of console lines.
    let observer: Arc<dyn SeriesObserver> = if json {
        Arc::new(TracingObserver)
    } else {
        Arc::new(ConsoleObserver)
    };
    let orchestrator = MatchOrchestrator::new(
        Arc::new(RemoteMatchClient::new(transport)),
        context,
        setup,
    )
    .with_backoff(config.backoff.clone())
    .with_observer(observer);

    let count = args.count as usize;
    let mut series = if opponents.len() == 1 {
        orchestrator.play_series(opponents[0].clone(), count)?
    } else {
        if count > 1 {
            warn!(
                count,
                opponents = opponents.len(),
                "multi-opponent runs play once per opponent; ignoring count"
            );
        }
        orchestrator.play_round_robin(opponents)?
    };

    let writer = MatchArtifactWriter::new(&outdir, args.output);
    println!("Playing {} match(es)...", series.total());
    while let Some(item) = series.next().await {
        let result = item.context("Match run stopped")?;
        if let Some(path) = writer.record(series.completed(), &result)? {
            debug!(path = %path.display(), "wrote match result");
        }
    }
    println!("Simulations done.");

    if json {
        println!("{}", serde_json::to_string_pretty(series.statistics())?);
    }
    METRICS.flush();
    Ok(())
}

fn build_transport(config: &ArenaConfig) -> Result<Arc<dyn ArenaTransport>> {
    let cookie = config.cookie_header()?;
    let transport = match config.request_timeout_secs {
        Some(secs) => {
            HttpTransport::with_timeout(config.base_url(), &cookie, Duration::from_secs(secs))?
        }
        None => HttpTransport::new(config.base_url(), &cookie)?,
    };
    Ok(Arc::new(transport))
}

fn read_code(path: &Path) -> Result<String> {
    let code = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read your code from {}", path.display()))?;
    Ok(code.trim().to_string())
}

async fn requested_opponents(
    resolver: &OpponentResolver,
    args: &PlayArgs,
    configured: &[i64],
) -> Result<Vec<Opponent>> {
    if let Some(choice) = args.filter {
        let filter = opponent_filter(choice, args.keyword.as_deref())?;
        info!(filter = filter.description(), "searching opponents");
        return resolver
            .search(&filter)
            .await
            .with_context(|| format!("Failed to find players who {}", filter.description()));
    }

    let specs = opponent_specs(args.top10, &args.agent2, configured)?;
    resolver
        .resolve(&specs)
        .await
        .context("Failed to resolve opponents")
}

/// Agent1 from the flag, else the config file, else own code.
fn agent1_spec(flag: Option<OpponentSpec>, configured: Option<i64>) -> Result<OpponentSpec> {
    if let Some(spec) = flag {
        return Ok(spec);
    }
    configured
        .map(OpponentSpec::try_from)
        .transpose()
        .context("Invalid 'agent1' in the config file")
        .map(|spec| spec.unwrap_or(OpponentSpec::OwnCode))
}

fn opponent_specs(
    top10: bool,
    requested: &[OpponentSpec],
    configured: &[i64],
) -> Result<Vec<OpponentSpec>> {
    if top10 {
        return Ok(vec![OpponentSpec::Top10]);
    }
    if !requested.is_empty() {
        return Ok(requested.to_vec());
    }
    if configured.is_empty() {
        bail!("No id(s) for agent 2 were specified. Add 'agent2' to the config file or use --agent2");
    }
    configured
        .iter()
        .copied()
        .map(OpponentSpec::try_from)
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid 'agent2' in the config file")
}

fn opponent_filter(choice: FilterChoice, keyword: Option<&str>) -> Result<OpponentFilter> {
    Ok(match choice {
        FilterChoice::SimilarRank => OpponentFilter::SimilarRank,
        FilterChoice::Following => OpponentFilter::Following,
        FilterChoice::Top10 => OpponentFilter::LeagueTop10,
        FilterChoice::Keyword => {
            let keyword = keyword
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .context("--filter keyword needs a non-empty --keyword")?;
            OpponentFilter::Keyword(keyword.to_string())
        }
    })
}

/// Prints one progress line per finished match on stdout.
struct ConsoleObserver;

impl SeriesObserver for ConsoleObserver {
    fn on_match_finished(&self, progress: &MatchProgress<'_>) {
        println!("{}", progress_line(progress));
    }

    fn on_rate_limited(&self, notice: &RateLimitNotice<'_>) {
        println!(
            "Rate limited ({}). Waiting {}s before retrying match {}",
            notice.message,
            notice.delay.as_secs(),
            notice.index
        );
    }
}

fn progress_line(progress: &MatchProgress<'_>) -> String {
    let stats = progress.statistics;
    let percent = |index: usize| {
        stats
            .win_rate(index)
            .map_or_else(|| "-".to_string(), |r| format!("{:.0}%", r * 100.0))
    };
    let margin = stats
        .margin_of_error()
        .map_or_else(|| "-".to_string(), |m| format!("{:.0}%", m * 100.0));
    let outcome = if progress.agent1_won() { "won" } else { "lost" };

    match stats.scope {
        StatsScope::BothAgents => format!(
            "{}/{} | Agent1: {} wins ({}) | Agent2: {} wins ({}) | Margin of Error: {}",
            progress.index,
            progress.total,
            stats.wins[0],
            percent(0),
            stats.wins[1],
            percent(1),
            margin
        ),
        StatsScope::Agent1Only => format!(
            "{}/{} | {} against {} | Agent1: {} wins ({}) | Margin of Error: {}",
            progress.index,
            progress.total,
            outcome,
            progress.opponent.label(),
            stats.wins[0],
            percent(0),
            margin
        ),
    }
}
