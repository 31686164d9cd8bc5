//! Live queries
//!
//! A live query runs once immediately and again after every invalidation of
//! the tables it observes, delivering each full result to its subscriber.

use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::handle::StorageHandle;
use crate::Result;

/// Snapshots buffered ahead of a slow subscriber
const BUFFER: usize = 16;

/// Subscriber side of a live query.
///
/// Each item is the complete, ordered result set as of some committed state.
/// A query error is delivered once and ends the subscription. Dropping the
/// `LiveQuery` stops the background task.
#[derive(Debug)]
pub struct LiveQuery<T> {
    rx: mpsc::Receiver<Result<Vec<T>>>,
}

impl<T: Send + 'static> LiveQuery<T> {
    /// Start observing `tables` and re-running `query` on every invalidation.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn spawn<F>(handle: Arc<StorageHandle>, tables: &[&'static str], query: F) -> Self
    where
        F: Fn(&Connection) -> Result<Vec<T>> + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel(BUFFER);
        // Registered before the first run so no commit is missed.
        let observer = handle.tracker().subscribe(tables);
        let query = Arc::new(query);
        let tables = tables.to_vec();

        tokio::spawn(async move {
            loop {
                let run = Arc::clone(&query);
                let snapshot = handle.read(move |conn| run(conn)).await;
                let failed = snapshot.is_err();

                if tx.send(snapshot).await.is_err() || failed {
                    break;
                }

                tokio::select! {
                    _ = observer.invalidated() => {}
                    _ = tx.closed() => break,
                }
            }
            tracing::debug!(?tables, "Live query stopped");
        });

        Self { rx }
    }
}

impl<T> LiveQuery<T> {
    /// Wait for the next snapshot. Returns `None` once the query has ended.
    pub async fn next(&mut self) -> Option<Result<Vec<T>>> {
        self.rx.recv().await
    }

    /// Adapt into a `Stream` of snapshots
    pub fn into_stream(self) -> ReceiverStream<Result<Vec<T>>> {
        ReceiverStream::new(self.rx)
    }
}
