//! Table invalidation tracking
//!
//! Observers register interest in a set of table names. After a write
//! transaction commits and changed at least one row, the tables it touched
//! are notified and every matching observer is woken. Wake-ups are
//! coalesced: an observer that has not yet re-run sees a single pending
//! notification no matter how many commits happened in between.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

type Registry = HashMap<&'static str, HashMap<u64, Arc<Notify>>>;

#[derive(Debug, Default)]
pub struct InvalidationTracker {
    next_id: AtomicU64,
    observers: Mutex<Registry>,
}

impl InvalidationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for `tables`. It stays registered until the
    /// returned handle is dropped.
    pub fn subscribe(self: &Arc<Self>, tables: &[&'static str]) -> ObserverHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let notify = Arc::new(Notify::new());

        let mut observers = self.lock();
        for table in tables {
            observers
                .entry(*table)
                .or_default()
                .insert(id, Arc::clone(&notify));
        }

        ObserverHandle {
            id,
            tables: tables.to_vec(),
            notify,
            tracker: Arc::clone(self),
        }
    }

    /// Wake every observer of any of `tables`
    pub fn notify(&self, tables: &[&str]) {
        let observers = self.lock();
        let mut woken = 0usize;
        for table in tables {
            if let Some(set) = observers.get(*table) {
                for notify in set.values() {
                    notify.notify_one();
                    woken += 1;
                }
            }
        }
        tracing::debug!(?tables, woken, "Tables invalidated");
    }

    /// Number of observers currently registered for `table`
    pub fn observer_count(&self, table: &str) -> usize {
        self.lock().get(table).map_or(0, HashMap::len)
    }

    fn unsubscribe(&self, id: u64, tables: &[&'static str]) {
        let mut observers = self.lock();
        for table in tables {
            if let Some(set) = observers.get_mut(*table) {
                set.remove(&id);
                if set.is_empty() {
                    observers.remove(*table);
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        // The registry stays consistent even if a holder panicked.
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Registration of one observer; unregisters on drop
#[derive(Debug)]
pub struct ObserverHandle {
    id: u64,
    tables: Vec<&'static str>,
    notify: Arc<Notify>,
    tracker: Arc<InvalidationTracker>,
}

impl ObserverHandle {
    /// Wait until one of the observed tables is invalidated
    pub async fn invalidated(&self) {
        self.notify.notified().await;
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.tracker.unsubscribe(self.id, &self.tables);
    }
}
