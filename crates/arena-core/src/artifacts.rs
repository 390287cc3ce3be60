//! Match artifacts written to the output directory.
//!
//! - `<stamp>-<n>.json`: one file per match result, in the remote shape
//! - `cached-game-options.txt`: referee input of the latest match, read back
//!   by replay runs to pin the next matches to the same conditions

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::ArenaResult;
use crate::model::MatchResult;

/// File holding the referee input of the last played match.
pub const CACHED_GAME_OPTIONS_FILE: &str = "cached-game-options.txt";

/// Writes the artifacts of one run into a directory.
#[derive(Debug, Clone)]
pub struct MatchArtifactWriter {
    outdir: PathBuf,
    stamp: String,
    write_results: bool,
}

impl MatchArtifactWriter {
    /// Writer stamped with the current local time.
    pub fn new(outdir: impl Into<PathBuf>, write_results: bool) -> Self {
        Self::with_stamp(outdir, run_stamp(Local::now()), write_results)
    }

    pub fn with_stamp(outdir: impl Into<PathBuf>, stamp: impl Into<String>, write_results: bool) -> Self {
        Self {
            outdir: outdir.into(),
            stamp: stamp.into(),
            write_results,
        }
    }

    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    /// Persist the `index`-th (1-based) result of the run.
    ///
    /// The referee input is always cached; the full result only when result
    /// output is enabled. Returns the result file path when one was written.
    pub fn record(&self, index: usize, result: &MatchResult) -> ArenaResult<Option<PathBuf>> {
        std::fs::create_dir_all(&self.outdir)?;
        std::fs::write(
            self.outdir.join(CACHED_GAME_OPTIONS_FILE),
            &result.referee_input,
        )?;

        if !self.write_results {
            return Ok(None);
        }
        let path = self.result_path(index);
        std::fs::write(&path, serde_json::to_vec_pretty(result)?)?;
        Ok(Some(path))
    }

    pub fn result_path(&self, index: usize) -> PathBuf {
        self.outdir.join(format!("{}-{}.json", self.stamp, index))
    }
}

/// Timestamp prefix shared by every result file of a run.
pub fn run_stamp(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d-%H%M%S").to_string()
}

/// Referee input cached by the previous run in `outdir`.
pub fn read_cached_game_options(outdir: &Path) -> ArenaResult<String> {
    let raw = std::fs::read_to_string(outdir.join(CACHED_GAME_OPTIONS_FILE))?;
    Ok(raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn result(referee_input: &str) -> MatchResult {
        MatchResult {
            frames: Vec::new(),
            game_id: 77,
            referee_input: referee_input.to_string(),
            scores: [1.into(), 0.into()],
            extra: Default::default(),
            ranks: [0, 1],
        }
    }

    #[test]
    fn test_run_stamp_format() {
        let now = Local.with_ymd_and_hms(2021, 5, 3, 9, 4, 7).unwrap();
        assert_eq!(run_stamp(now), "2021-05-03-090407");
    }

    #[test]
    fn test_record_writes_result_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MatchArtifactWriter::with_stamp(dir.path().join("out"), "stamp", true);

        let path = writer.record(1, &result("seed=1")).unwrap().unwrap();
        assert_eq!(path, dir.path().join("out").join("stamp-1.json"));

        let written: MatchResult =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written.game_id, 77);
        assert_eq!(
            read_cached_game_options(writer.outdir()).unwrap(),
            "seed=1"
        );

        writer.record(2, &result("seed=2\n")).unwrap();
        assert_eq!(
            read_cached_game_options(writer.outdir()).unwrap(),
            "seed=2"
        );
    }

    #[test]
    fn test_record_keeps_the_remote_record() {
        let body = serde_json::json!({
            "frames": [{"agentId": -1, "view": "v", "tooltips": ["t"]}],
            "gameId": 555,
            "metadata": {"stopReason": "x"},
            "ranks": [0, 1],
            "refereeInput": "seed=9",
            "scores": [12, 3],
            "viewer": "https://example.test/v.js"
        });
        let decoded: MatchResult = serde_json::from_value(body.clone()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let writer = MatchArtifactWriter::with_stamp(dir.path(), "stamp", true);
        let path = writer.record(1, &decoded).unwrap().unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, body);
        assert_eq!(written["scores"][0].as_i64(), Some(12));
    }

    #[test]
    fn test_record_without_results_only_caches() {
        let dir = tempfile::tempdir().unwrap();
        let writer = MatchArtifactWriter::with_stamp(dir.path(), "s", false);
        assert!(writer.record(1, &result("x")).unwrap().is_none());
        assert!(!writer.result_path(1).exists());
        assert_eq!(read_cached_game_options(dir.path()).unwrap(), "x");
    }

    #[test]
    fn test_missing_cache_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_cached_game_options(dir.path()).is_err());
    }
}
