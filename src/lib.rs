//! # tododb - Local To-do Storage
//!
//! SQLite-backed persistence for a small to-do list application.
//!
//! tododb provides:
//! - An item store with CRUD over to-do records and a live, time-ordered list
//! - An append-only diagnostic log store with a live, recency-ordered view
//! - Schema creation, validation and migration on open
//! - Table invalidation tracking that drives live query re-emission

pub mod todo;
pub mod log_entry;
pub mod converters;
pub mod storage;
pub mod logger;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use todo::{TodoItem, RepeatMode};
pub use log_entry::LogEntry;
pub use storage::{Database, DatabaseBuilder, LiveQuery, LogStore, Migration, TodoStore};
pub use logger::AppLogger;
pub use tokio_util::sync::CancellationToken;

/// Result type alias for tododb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for tododb operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Column conversion error: {0}")]
    Conversion(#[from] serde_json::Error),

    #[error("Schema validation failed for {table}.\n Expected:\n{expected}\n Found:\n{found}")]
    SchemaValidation {
        table: String,
        expected: String,
        found: String,
    },

    #[error("Schema identity mismatch: expected {expected}, found {found}. Bump the schema version and provide a migration")]
    IdentityMismatch { expected: String, found: String },

    #[error("No migration path from schema version {from} to {to}")]
    MigrationRequired { from: u32, to: u32 },

    #[error("Unknown repeat mode: {0}")]
    InvalidRepeatMode(String),

    #[error("Todo not found: {0}")]
    TodoNotFound(i64),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Background worker failed: {0}")]
    Worker(String),
}

impl Error {
    /// True when the underlying SQLite failure is a constraint violation
    /// (duplicate primary key, NOT NULL, ...).
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::Storage(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }

    /// True for a one-shot read that was cancelled before completing.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Worker(err.to_string())
    }
}
