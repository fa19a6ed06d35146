//! Errors raised by state stores.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state database: {0}")]
    Database(#[from] rusqlite::Error),

    /// Creating the store directory or rewriting the state file failed.
    #[error("state file: {0}")]
    Io(#[from] std::io::Error),

    /// A stored blob or the JSON state document is not valid JSON.
    #[error("stored state is not valid JSON: {0}")]
    Encoding(#[from] serde_json::Error),

    /// `complete_run` was called with an id `start_run` never returned.
    #[error("no run with id {0}")]
    UnknownRun(i64),

    /// A thread panicked while holding the store's lock.
    #[error("state store lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, StateError>;
