// src/error.rs
//! Failure taxonomy for one crawl run.
//!
//! Every variant is caught at the `BatchRunner` boundary; none of them ends the
//! process on its own.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrawlError {
    /// External fetch failed or returned nothing and no fallback is configured.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// Persisted seen-set exists but cannot be parsed.
    #[error("corrupt seen-set state at {path}: {source}")]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Seen-set or snapshot could not be written (or read back from disk).
    #[error("persistence failure at {path}: {source}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl CrawlError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PersistenceFailure {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly label, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable(_) => "source_unavailable",
            Self::CorruptState { .. } => "corrupt_state",
            Self::PersistenceFailure { .. } => "persistence_failure",
            Self::Config(_) => "config",
        }
    }
}
