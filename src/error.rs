// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a run. Anything surfacing as a `ReforgeError` during the
/// mutation window forces a rollback.
#[derive(Debug, Error)]
pub enum ReforgeError {
    #[error("I/O error: {source} (path: {path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("Snapshot failed: {0}")]
    Snapshot(String),

    #[error("Rollback failed: {0}")]
    Rollback(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("Fatal error in scheduler: {0}")]
    Scheduler(String),

    #[error("Fatal write failure on {path}: {reason}")]
    Fatal { path: PathBuf, reason: String },

    #[error("Run cancelled before phase '{0}'")]
    Cancelled(&'static str),

    #[error("Generic error: {0}")]
    Other(String),
}

impl ReforgeError {
    #[must_use]
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReforgeError>;

// Allow `?` on std::io::Error by converting to ReforgeError::Io with unknown path.
impl From<std::io::Error> for ReforgeError {
    fn from(source: std::io::Error) -> Self {
        ReforgeError::Io {
            source,
            path: PathBuf::from("<unknown>"),
        }
    }
}

impl From<walkdir::Error> for ReforgeError {
    fn from(e: walkdir::Error) -> Self {
        ReforgeError::Other(e.to_string())
    }
}

impl From<serde_json::Error> for ReforgeError {
    fn from(e: serde_json::Error) -> Self {
        ReforgeError::Other(e.to_string())
    }
}

/// A single plan could not be applied safely. Recorded as a failed result;
/// the file is left untouched and the batch continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("cannot parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("no module layout for {0}")]
    UnsupportedLanguage(String),

    #[error("nothing to split: {0}")]
    NothingToSplit(String),

    #[error("ambiguous strategy: {0}")]
    Ambiguous(String),

    #[error("unreadable source {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("timed out after {0}ms")]
    TimedOut(u64),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("worker panicked: {0}")]
    Panicked(String),
}
