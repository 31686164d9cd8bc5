//! Application diagnostic logger
//!
//! Writes [`LogEntry`] rows from anywhere in the application without making
//! the caller wait or handle storage failures.

use tokio::task::JoinHandle;

use crate::log_entry::LogEntry;
use crate::storage::LogStore;

#[derive(Debug, Clone)]
pub struct AppLogger {
    store: LogStore,
}

impl AppLogger {
    pub fn new(store: LogStore) -> Self {
        Self { store }
    }

    /// Append an entry on a background task.
    ///
    /// Failures are reported through `tracing` and never reach the caller.
    /// The returned handle may be awaited to make sure the entry is written,
    /// e.g. before the process exits.
    pub fn log(&self, tag: impl Into<String>, message: impl Into<String>) -> JoinHandle<()> {
        let entry = LogEntry::new(tag, message);
        tracing::debug!(tag = %entry.tag, message = %entry.message, "App log");

        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.insert(&entry).await {
                tracing::warn!(tag = %entry.tag, error = %e, "Failed to persist log entry");
            }
        })
    }
}
