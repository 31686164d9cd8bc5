//! Shared connection handle
//!
//! Owns the single SQLite connection used by every store. All statements run
//! on Tokio's blocking pool; write transactions notify the invalidation
//! tracker once they have committed.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, Transaction};
use tokio_util::sync::CancellationToken;

use super::invalidation::InvalidationTracker;
use crate::{Error, Result};

#[derive(Debug)]
pub struct StorageHandle {
    conn: Mutex<Connection>,
    tracker: Arc<InvalidationTracker>,
}

impl StorageHandle {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            tracker: Arc::new(InvalidationTracker::new()),
        }
    }

    pub fn tracker(&self) -> &Arc<InvalidationTracker> {
        &self.tracker
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Worker("connection lock poisoned".to_string()))
    }

    /// Run `f` inside a transaction, committing only if it succeeds.
    ///
    /// When the committed transaction changed any rows, observers of
    /// `tables` are notified after the connection is released.
    pub fn write_blocking<T, F>(&self, tables: &[&str], f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let (value, changed) = {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            let before = total_changes(&tx)?;
            let value = f(&tx)?;
            let after = total_changes(&tx)?;
            tx.commit()?;
            (value, after - before)
        };

        if changed > 0 {
            self.tracker.notify(tables);
        }
        Ok(value)
    }

    /// Run `f` against the connection outside of any explicit transaction
    pub fn read_blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Exclusive access to the connection for maintenance work that manages
    /// its own transactions.
    pub fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }

    /// [`write_blocking`](Self::write_blocking) on the blocking pool
    pub async fn write<T, F>(self: &Arc<Self>, tables: &'static [&'static str], f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> Result<T> + Send + 'static,
    {
        let handle = Arc::clone(self);
        tokio::task::spawn_blocking(move || handle.write_blocking(tables, f)).await?
    }

    /// [`read_blocking`](Self::read_blocking) on the blocking pool
    pub async fn read<T, F>(self: &Arc<Self>, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let handle = Arc::clone(self);
        tokio::task::spawn_blocking(move || handle.read_blocking(f)).await?
    }

    /// A read that can be abandoned through `token`.
    ///
    /// `f` receives the token and must stop with [`Error::Cancelled`] once it
    /// is cancelled. On cancellation this waits for the blocking read to
    /// return, so its statement and cursor are released before
    /// `Error::Cancelled` reaches the caller.
    pub async fn read_cancellable<T, F>(self: &Arc<Self>, token: CancellationToken, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &CancellationToken) -> Result<T> + Send + 'static,
    {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let handle = Arc::clone(self);
        let task_token = token.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            if task_token.is_cancelled() {
                return Err(Error::Cancelled);
            }
            handle.read_blocking(|conn| f(conn, &task_token))
        });

        tokio::select! {
            joined = &mut task => joined?,
            _ = token.cancelled() => {
                let _ = task.await;
                tracing::debug!("Read cancelled");
                Err(Error::Cancelled)
            }
        }
    }
}

fn total_changes(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT total_changes()", [], |row| row.get(0))?)
}

/// Check the token between rows of a one-shot read
pub fn ensure_not_cancelled(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> Arc<StorageHandle> {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT NOT NULL)")
            .unwrap();
        Arc::new(StorageHandle::new(conn))
    }

    fn count(handle: &StorageHandle) -> i64 {
        handle
            .read_blocking(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))?))
            .unwrap()
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let handle = handle();
        let result: Result<()> = handle.write_blocking(&["t"], |tx| {
            tx.execute("INSERT INTO t (v) VALUES ('a')", [])?;
            tx.execute("INSERT INTO t (v) VALUES (NULL)", [])?;
            Ok(())
        });
        assert!(result.unwrap_err().is_constraint_violation());
        assert_eq!(count(&handle), 0);
    }

    #[tokio::test]
    async fn test_commit_notifies_only_on_change() {
        let handle = handle();
        let observer = handle.tracker().subscribe(&["t"]);

        handle
            .write(&["t"], |tx| Ok(tx.execute("DELETE FROM t WHERE id = 99", [])?))
            .await
            .unwrap();
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), observer.invalidated())
                .await
                .is_err()
        );

        handle
            .write(&["t"], |tx| Ok(tx.execute("INSERT INTO t (v) VALUES ('a')", [])?))
            .await
            .unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), observer.invalidated())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_pre_cancelled_read() {
        let handle = handle();
        let token = CancellationToken::new();
        token.cancel();
        let result = handle
            .read_cancellable(token, |conn, _| {
                Ok(conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get::<_, i64>(0))?)
            })
            .await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
