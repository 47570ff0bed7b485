use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating `.rewind/config.json`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid utc_offset {0:?} (expected e.g. \"-05:00\" or \"+01:00\")")]
    InvalidOffset(String),

    #[error("max_concurrency must be at least 1")]
    InvalidConcurrency,
}

/// Errors raised while building a [`crate::TargetMoment`] from operator input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MomentError {
    #[error("invalid due date {0:?} (expected yyyy-mm-dd)")]
    InvalidDate(String),

    #[error("invalid due time {0:?} (expected 24h HH:MM or HH:MM:SS)")]
    InvalidTime(String),
}
