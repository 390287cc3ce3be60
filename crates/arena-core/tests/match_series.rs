//! End-to-end tests for match sequencing, statistics and rate-limit backoff.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use arena_core::backoff::BackoffPolicy;
use arena_core::error::ArenaError;
use arena_core::fakes::{match_result, sample_context, ObservedEvent, RecordingObserver, ScriptedPlayer};
use arena_core::model::Opponent;
use arena_core::orchestrator::{MatchOrchestrator, MatchSetup, SeriesMode, SeriesOutcome};
use arena_core::stats::StatsScope;

fn setup() -> MatchSetup {
    MatchSetup {
        code: "fn main() {}".to_string(),
        programming_language_id: "Rust".to_string(),
        agent1: Opponent::own_code(),
        game_options: None,
    }
}

fn orchestrator(player: &Arc<ScriptedPlayer>) -> MatchOrchestrator {
    MatchOrchestrator::new(player.clone(), Arc::new(sample_context()), setup())
}

// -------------------------------------------------------------------------
// Series statistics
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_series_counts_wins_for_both_agents() {
    let player = Arc::new(ScriptedPlayer::new());
    player.push_ok(match_result(1, [0, 1]));
    player.push_ok(match_result(2, [1, 0]));
    player.push_ok(match_result(3, [0, 1]));

    let observer = Arc::new(RecordingObserver::new());
    let mut series = orchestrator(&player)
        .with_observer(observer.clone())
        .play_series(Opponent::new(42, "rival"), 3)
        .unwrap();
    assert_eq!(series.mode(), SeriesMode::Series);
    assert_eq!(series.total(), 3);

    let mut game_ids = Vec::new();
    while let Some(result) = series.next().await {
        game_ids.push(result.unwrap().game_id);
    }
    assert_eq!(game_ids, vec![1, 2, 3]);
    assert!(series.is_finished());
    assert_eq!(series.outcome(), Some(SeriesOutcome::Completed));
    assert!(series.next().await.is_none());

    let stats = series.statistics();
    assert_eq!(stats.scope, StatsScope::BothAgents);
    assert_eq!(stats.games_played, 3);
    assert_eq!(stats.wins, [2, 1]);
    let rate = stats.win_rate(0).unwrap();
    assert!((rate - 2.0 / 3.0).abs() < 1e-9);
    let margin = stats.margin_of_error().unwrap();
    assert!((margin - 1.0 / 3f64.sqrt()).abs() < 1e-9);

    let finished: Vec<_> = observer
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ObservedEvent::Finished {
                index,
                games_played,
                wins,
                ..
            } => Some((index, games_played, wins)),
            _ => None,
        })
        .collect();
    assert_eq!(finished, vec![(1, 1, [1, 0]), (2, 2, [1, 1]), (3, 3, [2, 1])]);
}

fn series_endings(observer: &RecordingObserver) -> Vec<(SeriesOutcome, u32)> {
    observer
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ObservedEvent::SeriesFinished {
                outcome,
                games_played,
            } => Some((outcome, games_played)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_draw_counts_for_both_agents() {
    let player = Arc::new(ScriptedPlayer::new());
    player.push_ok(match_result(1, [0, 0]));

    let results = orchestrator(&player)
        .play_series(Opponent::new(42, "rival"), 1)
        .unwrap()
        .collect_results()
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].won(0) && results[0].won(1));
}

#[tokio::test]
async fn test_round_robin_plays_each_opponent_once_in_order() {
    let player = Arc::new(ScriptedPlayer::new());
    player.push_ok(match_result(1, [0, 1]));
    player.push_ok(match_result(2, [1, 0]));
    player.push_ok(match_result(3, [0, 1]));

    let opponents = vec![
        Opponent::new(11, "a"),
        Opponent::new(12, "b"),
        Opponent::new(13, "c"),
    ];
    let mut series = orchestrator(&player).play_round_robin(opponents).unwrap();
    assert_eq!(series.mode(), SeriesMode::RoundRobin);
    while let Some(result) = series.next().await {
        result.unwrap();
    }

    let stats = series.statistics();
    assert_eq!(stats.scope, StatsScope::Agent1Only);
    assert_eq!(stats.games_played, 3);
    assert_eq!(stats.wins, [2, 0]);

    let agent2_ids: Vec<i64> = player.requests().iter().map(|r| r.agent2_id).collect();
    assert_eq!(agent2_ids, vec![11, 12, 13]);
}

#[tokio::test]
async fn test_series_is_lazy() {
    let player = Arc::new(ScriptedPlayer::new());
    player.push_ok(match_result(1, [0, 1]));
    player.push_ok(match_result(2, [0, 1]));

    let mut series = orchestrator(&player)
        .play_series(Opponent::new(42, "rival"), 2)
        .unwrap();
    assert_eq!(player.calls(), 0);

    series.next().await.unwrap().unwrap();
    assert_eq!(player.calls(), 1);
    assert_eq!(series.completed(), 1);
}

#[tokio::test]
async fn test_stream_adapter_yields_results() {
    let player = Arc::new(ScriptedPlayer::new());
    player.push_ok(match_result(7, [0, 1]));
    player.push_ok(match_result(8, [1, 0]));

    let series = orchestrator(&player)
        .play_series(Opponent::new(42, "rival"), 2)
        .unwrap();
    let ids: Vec<i64> = series
        .into_stream()
        .map(|r| r.unwrap().game_id)
        .collect()
        .await;
    assert_eq!(ids, vec![7, 8]);
}

// -------------------------------------------------------------------------
// Failure handling
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_remote_error_ends_series_without_retry() {
    let player = Arc::new(ScriptedPlayer::new());
    player.push_ok(match_result(1, [0, 1]));
    player.push_remote_error("boom");
    player.push_ok(match_result(3, [0, 1]));

    let observer = Arc::new(RecordingObserver::new());
    let mut series = orchestrator(&player)
        .with_observer(observer.clone())
        .play_series(Opponent::new(42, "rival"), 3)
        .unwrap();
    assert!(series.next().await.unwrap().is_ok());
    assert_eq!(series.outcome(), None);
    let err = series.next().await.unwrap().unwrap_err();
    assert!(matches!(err, ArenaError::RemoteService(ref m) if m == "boom"));
    assert_eq!(series.outcome(), Some(SeriesOutcome::Failed));
    assert!(series.next().await.is_none());
    assert_eq!(player.calls(), 2);
    assert_eq!(series.statistics().games_played, 1);
    assert_eq!(series_endings(&observer), vec![(SeriesOutcome::Failed, 1)]);
}

#[tokio::test]
async fn test_completed_series_reports_its_ending_once() {
    let player = Arc::new(ScriptedPlayer::new());
    player.push_ok(match_result(1, [0, 1]));

    let observer = Arc::new(RecordingObserver::new());
    let mut series = orchestrator(&player)
        .with_observer(observer.clone())
        .play_round_robin(vec![Opponent::new(7, "a")])
        .unwrap();
    while series.next().await.is_some() {}
    assert!(series.next().await.is_none());

    assert_eq!(series.outcome(), Some(SeriesOutcome::Completed));
    assert_eq!(series_endings(&observer), vec![(SeriesOutcome::Completed, 1)]);
}

#[tokio::test]
async fn test_collect_results_stops_at_first_error() {
    let player = Arc::new(ScriptedPlayer::new());
    player.push_remote_error("down");

    let err = orchestrator(&player)
        .play_series(Opponent::new(42, "rival"), 5)
        .unwrap()
        .collect_results()
        .await
        .unwrap_err();
    assert!(matches!(err, ArenaError::RemoteService(_)));
    assert_eq!(player.calls(), 1);
}

// -------------------------------------------------------------------------
// Rate-limit backoff (paused clock)
// -------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_single_rate_limit_waits_base_delay() {
    let player = Arc::new(ScriptedPlayer::new());
    player.push_rate_limited("too many games");
    player.push_ok(match_result(1, [0, 1]));

    let observer = Arc::new(RecordingObserver::new());
    let mut series = orchestrator(&player)
        .with_observer(observer.clone())
        .play_series(Opponent::new(42, "rival"), 1)
        .unwrap();

    let result = series.next().await.unwrap().unwrap();
    assert_eq!(result.game_id, 1);
    assert_eq!(player.calls(), 2);
    assert_eq!(player.gaps(), vec![Duration::from_secs(10)]);
    assert_eq!(observer.delays(), vec![Duration::from_secs(10)]);
    assert_eq!(series.statistics().games_played, 1);
}

#[tokio::test(start_paused = true)]
async fn test_consecutive_rate_limits_double_the_wait() {
    let player = Arc::new(ScriptedPlayer::new());
    player.push_rate_limited("slow down");
    player.push_rate_limited("slow down");
    player.push_ok(match_result(1, [0, 1]));

    let mut series = orchestrator(&player)
        .play_series(Opponent::new(42, "rival"), 1)
        .unwrap();
    series.next().await.unwrap().unwrap();

    assert_eq!(
        player.gaps(),
        vec![Duration::from_secs(10), Duration::from_secs(20)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_backoff_resets_after_success() {
    let player = Arc::new(ScriptedPlayer::new());
    player.push_rate_limited("slow down");
    player.push_rate_limited("slow down");
    player.push_ok(match_result(1, [0, 1]));
    player.push_rate_limited("slow down");
    player.push_ok(match_result(2, [0, 1]));

    let observer = Arc::new(RecordingObserver::new());
    let results = orchestrator(&player)
        .with_observer(observer.clone())
        .play_series(Opponent::new(42, "rival"), 2)
        .unwrap()
        .collect_results()
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(
        observer.delays(),
        vec![
            Duration::from_secs(10),
            Duration::from_secs(20),
            Duration::from_secs(10)
        ]
    );

    let retries: Vec<(usize, u32)> = observer
        .events()
        .into_iter()
        .filter_map(|e| match e {
            ObservedEvent::RateLimited { index, retry, .. } => Some((index, retry)),
            _ => None,
        })
        .collect();
    assert_eq!(retries, vec![(1, 1), (1, 2), (2, 1)]);
}

#[tokio::test(start_paused = true)]
async fn test_retry_ceiling_surfaces_exhaustion() {
    let player = Arc::new(ScriptedPlayer::new());
    for _ in 0..3 {
        player.push_rate_limited("still too many");
    }

    let observer = Arc::new(RecordingObserver::new());
    let mut series = orchestrator(&player)
        .with_observer(observer.clone())
        .with_backoff(BackoffPolicy::default().with_max_retries(2))
        .play_series(Opponent::new(42, "rival"), 1)
        .unwrap();

    let err = series.next().await.unwrap().unwrap_err();
    match err {
        ArenaError::RateLimitExhausted { attempts, message } => {
            assert_eq!(attempts, 3);
            assert_eq!(message, "still too many");
        }
        other => panic!("expected RateLimitExhausted, got {:?}", other),
    }
    assert_eq!(player.calls(), 3);
    assert!(series.next().await.is_none());
    assert_eq!(series.outcome(), Some(SeriesOutcome::RateLimitExhausted));
    assert_eq!(
        series_endings(&observer),
        vec![(SeriesOutcome::RateLimitExhausted, 0)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_custom_base_delay() {
    let player = Arc::new(ScriptedPlayer::new());
    player.push_rate_limited("wait");
    player.push_ok(match_result(1, [0, 1]));

    let policy = BackoffPolicy {
        base_delay_ms: 250,
        max_retries: None,
    };
    orchestrator(&player)
        .with_backoff(policy)
        .play_series(Opponent::new(42, "rival"), 1)
        .unwrap()
        .collect_results()
        .await
        .unwrap();
    assert_eq!(player.gaps(), vec![Duration::from_millis(250)]);
}
