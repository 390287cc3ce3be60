//! Run configuration.
//!
//! Configuration is read from a JSON file (by default `./cgconfig.json`)
//! with camelCase keys:
//!
//! ```json
//! {
//!   "cookie": "<rememberMe cookie value>",
//!   "userId": 1234567,
//!   "puzzleName": "spring-challenge-2021",
//!   "codePath": "./bot.py",
//!   "programmingLanguageId": "Python3",
//!   "agent1": -1,
//!   "agent2": [-2, 2345678],
//!   "outputDir": "./cg-out",
//!   "backoff": { "baseDelayMs": 10000, "maxRetries": 12 }
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `ARENA_COOKIE`: overrides `cookie`
//! - `ARENA_BASE_URL`: overrides `baseUrl` (default: the public services URL)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::backoff::BackoffPolicy;
use crate::error::{ArenaError, ArenaResult};
use crate::transport::DEFAULT_BASE_URL;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "./cgconfig.json";

/// Default directory for match artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "./cg-out";

/// Name of the session cookie the arena expects.
const COOKIE_NAME: &str = "rememberMe";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaConfig {
    pub cookie: Option<String>,
    pub user_id: Option<i64>,
    pub puzzle_name: Option<String>,
    pub code_path: Option<PathBuf>,
    pub programming_language_id: Option<String>,
    pub agent1: Option<i64>,
    /// A single id or a list of ids.
    #[serde(default, deserialize_with = "one_or_many")]
    pub agent2: Vec<i64>,
    pub output_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub backoff: BackoffPolicy,
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(i64),
        Many(Vec<i64>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(id)) => vec![id],
        Some(OneOrMany::Many(ids)) => ids,
    })
}

impl ArenaConfig {
    /// Load the configuration file at `path`.
    pub fn from_path(path: &Path) -> ArenaResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ArenaError::Config(format!(
                "could not read config file at {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            ArenaError::Config(format!("invalid config file at {}: {e}", path.display()))
        })
    }

    /// Load from `path` and apply environment overrides.
    pub fn load(path: &Path) -> ArenaResult<Self> {
        let mut config = Self::from_path(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `ARENA_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(cookie) = lookup("ARENA_COOKIE").filter(|v| !v.is_empty()) {
            self.cookie = Some(cookie);
        }
        if let Some(base_url) = lookup("ARENA_BASE_URL").filter(|v| !v.is_empty()) {
            self.base_url = Some(base_url);
        }
    }

    /// Check that everything a play run needs is present.
    pub fn validate(&self) -> ArenaResult<()> {
        let mut missing = Vec::new();
        if self.cookie.as_deref().map_or(true, str::is_empty) {
            missing.push("cookie");
        }
        if self.user_id.is_none() {
            missing.push("userId");
        }
        if self.puzzle_name.as_deref().map_or(true, str::is_empty) {
            missing.push("puzzleName");
        }
        if self.code_path.is_none() {
            missing.push("codePath");
        }
        if self
            .programming_language_id
            .as_deref()
            .map_or(true, str::is_empty)
        {
            missing.push("programmingLanguageId");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ArenaError::Config(format!(
                "missing required value(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Cookie header value, `rememberMe=<cookie>`.
    pub fn cookie_header(&self) -> ArenaResult<String> {
        let cookie = self
            .cookie
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ArenaError::Config("no cookie was specified".to_string()))?;
        if cookie.starts_with(&format!("{COOKIE_NAME}=")) {
            Ok(cookie.to_string())
        } else {
            Ok(format!("{COOKIE_NAME}={cookie}"))
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> ArenaConfig {
        ArenaConfig {
            cookie: Some("abc".into()),
            user_id: Some(1),
            puzzle_name: Some("spring-challenge-2021".into()),
            code_path: Some(PathBuf::from("bot.py")),
            programming_language_id: Some("Python3".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_agent2_accepts_single_id_or_list() {
        let config: ArenaConfig = serde_json::from_str(r#"{"agent2": 42}"#).unwrap();
        assert_eq!(config.agent2, vec![42]);

        let config: ArenaConfig = serde_json::from_str(r#"{"agent2": [-2, 7]}"#).unwrap();
        assert_eq!(config.agent2, vec![-2, 7]);

        let config: ArenaConfig = serde_json::from_str(r#"{}"#).unwrap();
        assert!(config.agent2.is_empty());
        assert_eq!(config.backoff, BackoffPolicy::default());
    }

    #[test]
    fn test_from_path_reads_camel_case_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cgconfig.json");
        std::fs::write(
            &path,
            r#"{"cookie": "c", "userId": 99, "puzzleName": "p", "codePath": "a.rs",
                "programmingLanguageId": "Rust", "agent1": -1, "agent2": [5],
                "backoff": {"maxRetries": 3}}"#,
        )
        .unwrap();

        let config = ArenaConfig::from_path(&path).unwrap();
        assert_eq!(config.user_id, Some(99));
        assert_eq!(config.agent1, Some(-1));
        assert_eq!(config.backoff.max_retries, Some(3));
        assert_eq!(config.backoff.base_delay_ms, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ArenaConfig::from_path(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ArenaError::Config(ref m) if m.contains("nope.json")));
    }

    #[test]
    fn test_validate_lists_missing_values() {
        let err = ArenaConfig::default().validate().unwrap_err();
        let msg = err.to_string();
        for key in ["cookie", "userId", "puzzleName", "codePath", "programmingLanguageId"] {
            assert!(msg.contains(key), "missing key in message: {}", key);
        }
        assert!(full_config().validate().is_ok());
    }

    #[test]
    fn test_cookie_header() {
        assert_eq!(full_config().cookie_header().unwrap(), "rememberMe=abc");

        let mut config = full_config();
        config.cookie = Some("rememberMe=xyz".into());
        assert_eq!(config.cookie_header().unwrap(), "rememberMe=xyz");

        assert!(ArenaConfig::default().cookie_header().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = full_config();
        config.apply_overrides(|key| match key {
            "ARENA_COOKIE" => Some("from-env".to_string()),
            "ARENA_BASE_URL" => Some("http://localhost:9999/services".to_string()),
            _ => None,
        });
        assert_eq!(config.cookie.as_deref(), Some("from-env"));
        assert_eq!(config.base_url(), "http://localhost:9999/services");
    }

    #[test]
    fn test_defaults() {
        let config = ArenaConfig::default();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.output_dir(), PathBuf::from(DEFAULT_OUTPUT_DIR));
    }
}
