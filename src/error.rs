//! Error types shared across the crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by application-level operations
#[derive(Error, Debug)]
pub enum AppError {
    /// A shared state mutex was poisoned by a panicking holder
    #[error("Failed to lock {what}: {message}")]
    LockPoisoned { what: &'static str, message: String },

    /// Duration index outside of the selectable range
    #[error("Duration index {0} is out of range (expected 0..=11)")]
    InvalidDurationIndex(usize),

    /// Duration changes are ignored while a run is counting down
    #[error("Cannot change the duration while the timer is running")]
    DurationLocked,

    #[error(transparent)]
    History(#[from] HistoryError),
}

impl AppError {
    pub(crate) fn poisoned<E: std::fmt::Display>(what: &'static str, err: E) -> Self {
        Self::LockPoisoned {
            what,
            message: err.to_string(),
        }
    }
}

/// Errors from the history store
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History file I/O failed at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("History file {path} is not valid JSON")]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("History entry {0} not found")]
    NotFound(u64),

    #[error("History index {index} is out of range ({len} entries)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Failed to lock history store: {0}")]
    LockPoisoned(String),
}

/// Failure reported by a recorder callback
#[derive(Error, Debug)]
#[error("Failed to record run: {0}")]
pub struct RecordError(pub String);

impl From<HistoryError> for RecordError {
    fn from(err: HistoryError) -> Self {
        Self(err.to_string())
    }
}
