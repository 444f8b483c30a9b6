//! Error types.
//!
//! Per-repository failures are typed so the pipeline can tell an empty
//! remote apart from a real failure; process-level code wraps everything
//! else in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the repository fetcher.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("remote repository is empty")]
    EmptyRemote,
    #[error("fetch cancelled")]
    Cancelled,
    #[error("clone of {location} failed: {source}")]
    Git {
        location: String,
        #[source]
        source: git2::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the line counter.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("analysis cancelled")]
    Cancelled,
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Errors from the on-disk metrics cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("invalid cache entry name: {0:?}")]
    InvalidName(String),
    #[error("cache IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt cache entry {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to persist cache entry {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

/// Errors from processing a single repository.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("cannot derive a repository name from {0:?}")]
    InvalidLocation(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("storage failed: {0}")]
    Storage(#[from] CacheError),
    #[error("cancelled before completion")]
    Cancelled,
    #[error("task failed: {0}")]
    Task(String),
}

/// Configuration errors. These are the only fatal errors before work starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{setting} is required (set {env} or pass --{flag})")]
    Missing {
        setting: &'static str,
        env: &'static str,
        flag: &'static str,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ProcessError {
    /// Whether this failure came from cancellation rather than a real error.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ProcessError::Cancelled
                | ProcessError::Fetch(FetchError::Cancelled)
                | ProcessError::Analysis(AnalysisError::Cancelled)
        )
    }
}
