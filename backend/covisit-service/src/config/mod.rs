use crate::error::{AppError, Result};
use event_schema::{TimestampMs, DAY_MS};
use serde::Deserialize;
use std::path::PathBuf;

/// Service configuration, loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory of training event chunks (`*.jsonl`)
    #[serde(default = "default_train_chunks_dir")]
    pub train_chunks_dir: PathBuf,

    /// Directory of test-session chunks (`*.jsonl`)
    #[serde(default = "default_test_chunks_dir")]
    pub test_chunks_dir: PathBuf,

    /// Where Top-K tables are persisted
    #[serde(default = "default_tables_dir")]
    pub tables_dir: PathBuf,

    #[serde(default = "default_submission_path")]
    pub submission_path: PathBuf,

    /// Neighbours kept per item
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Cap on every candidate list
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,

    /// Events kept per session for the time-weighted graphs
    #[serde(default = "default_session_tail_len")]
    pub session_tail_len: usize,

    /// Maximum time distance between the two events of a weighted pair
    #[serde(default = "default_pair_window_ms")]
    pub pair_window_ms: TimestampMs,

    // ============================================
    // Build job configuration
    // ============================================
    #[serde(default = "default_build_workers")]
    pub build_workers: usize,

    #[serde(default = "default_adjacency_shards")]
    pub adjacency_shards: usize,

    /// Leave tables that are already persisted untouched
    #[serde(default = "default_skip_existing_tables")]
    pub skip_existing_tables: bool,
}

fn default_train_chunks_dir() -> PathBuf {
    PathBuf::from("./data/train")
}

fn default_test_chunks_dir() -> PathBuf {
    PathBuf::from("./data/test")
}

fn default_tables_dir() -> PathBuf {
    PathBuf::from("./tables")
}

fn default_submission_path() -> PathBuf {
    PathBuf::from("./submission.csv")
}

fn default_top_k() -> usize {
    20
}

fn default_candidate_limit() -> usize {
    20
}

fn default_session_tail_len() -> usize {
    30
}

fn default_pair_window_ms() -> TimestampMs {
    DAY_MS
}

fn default_build_workers() -> usize {
    4
}

fn default_adjacency_shards() -> usize {
    16
}

fn default_skip_existing_tables() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            train_chunks_dir: default_train_chunks_dir(),
            test_chunks_dir: default_test_chunks_dir(),
            tables_dir: default_tables_dir(),
            submission_path: default_submission_path(),
            top_k: default_top_k(),
            candidate_limit: default_candidate_limit(),
            session_tail_len: default_session_tail_len(),
            pair_window_ms: default_pair_window_ms(),
            build_workers: default_build_workers(),
            adjacency_shards: default_adjacency_shards(),
            skip_existing_tables: default_skip_existing_tables(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config: Config = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("TOP_K", self.top_k),
            ("CANDIDATE_LIMIT", self.candidate_limit),
            ("SESSION_TAIL_LEN", self.session_tail_len),
            ("BUILD_WORKERS", self.build_workers),
            ("ADJACENCY_SHARDS", self.adjacency_shards),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(AppError::Configuration(format!("{} must be at least 1", name)));
            }
        }

        if self.pair_window_ms <= 0 {
            return Err(AppError::Configuration(format!(
                "PAIR_WINDOW_MS must be positive, got {}",
                self.pair_window_ms
            )));
        }

        Ok(())
    }
}
