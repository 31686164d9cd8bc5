//! Log store: append-only diagnostic entries in `app_logs`

use std::sync::Arc;

use rusqlite::{params, Connection, Row};

use super::handle::StorageHandle;
use super::live::LiveQuery;
use super::schema::APP_LOGS;
use crate::log_entry::LogEntry;
use crate::Result;

const TABLES: &[&str] = &[APP_LOGS];

/// Data access for diagnostic log entries.
///
/// Entries are never updated; the only removal is [`clear_logs`](Self::clear_logs).
#[derive(Debug, Clone)]
pub struct LogStore {
    handle: Arc<StorageHandle>,
}

impl LogStore {
    pub(crate) fn new(handle: Arc<StorageHandle>) -> Self {
        Self { handle }
    }

    /// Append an entry. A duplicate id is a constraint violation, not an
    /// overwrite.
    pub async fn insert(&self, entry: &LogEntry) -> Result<()> {
        let entry = entry.clone();
        self.handle
            .write(TABLES, move |tx| {
                let mut stmt = tx.prepare(
                    "INSERT OR ABORT INTO `app_logs` (`id`, `timestamp`, `tag`, `message`) \
                     VALUES (nullif(?1, 0), ?2, ?3, ?4)",
                )?;
                stmt.execute(params![entry.id, entry.timestamp, entry.tag, entry.message])?;
                Ok(())
            })
            .await
    }

    /// Delete every entry
    pub async fn clear_logs(&self) -> Result<()> {
        let cleared = self
            .handle
            .write(TABLES, |tx| Ok(tx.execute("DELETE FROM `app_logs`", [])?))
            .await?;
        tracing::debug!(cleared, "Cleared logs");
        Ok(())
    }

    /// All entries, newest first, re-emitted after every change to `app_logs`
    pub fn get_all_logs(&self) -> LiveQuery<LogEntry> {
        LiveQuery::spawn(Arc::clone(&self.handle), TABLES, query_all)
    }

    /// All entries, newest first
    pub async fn get_all_logs_list(&self) -> Result<Vec<LogEntry>> {
        self.handle.read(query_all).await
    }
}

fn query_all(conn: &Connection) -> Result<Vec<LogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, timestamp, tag, message FROM app_logs ORDER BY timestamp DESC",
    )?;
    let entries = stmt
        .query_map([], row_to_entry)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<LogEntry> {
    Ok(LogEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        tag: row.get(2)?,
        message: row.get(3)?,
    })
}
