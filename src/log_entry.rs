//! Diagnostic log entries, persisted in `app_logs`

use serde::{Deserialize, Serialize};

/// One diagnostic log line. Entries are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub tag: String,
    pub message: String,
}

impl LogEntry {
    /// Create an unsaved entry stamped with the current time
    pub fn new(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::at(now_millis(), tag, message)
    }

    /// Create an unsaved entry with an explicit timestamp
    pub fn at(timestamp: i64, tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            timestamp,
            tag: tag.into(),
            message: message.into(),
        }
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
