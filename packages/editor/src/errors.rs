//! Error types for the editor

use chrono::NaiveDate;
use thiserror::Error;

/// Failure reported by a `NoteStore`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("No note exists for {0}")]
    NotFound(NaiveDate),

    #[error("A note for {0} already exists")]
    Conflict(NaiveDate),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("No saved note is open")]
    NoActiveNote,

    #[error("A save or delete is already in flight")]
    InFlight,

    #[error("Autosave coordinator is closed")]
    CoordinatorClosed,

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
