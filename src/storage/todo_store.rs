//! Item store: to-do records in `todo_items`

use std::sync::Arc;

use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Row, Transaction};
use tokio_util::sync::CancellationToken;

use super::handle::{ensure_not_cancelled, StorageHandle};
use super::live::LiveQuery;
use super::schema::TODO_ITEMS;
use crate::converters::{string_list_from_column, string_list_to_column};
use crate::todo::TodoItem;
use crate::{Error, Result};

const TABLES: &[&str] = &[TODO_ITEMS];

const SELECT_COLUMNS: &str = "id, name, timeInMillis, isMonthly, remindCount, isDone, remarks, \
     imagePaths, maxRetries, retryIntervalHours, repeatMode";

const INSERT_SQL: &str = "INSERT OR REPLACE INTO `todo_items` (`id`, `name`, `timeInMillis`, \
     `isMonthly`, `remindCount`, `isDone`, `remarks`, `imagePaths`, `maxRetries`, \
     `retryIntervalHours`, `repeatMode`) VALUES (nullif(?1, 0), ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

const UPDATE_SQL: &str = "UPDATE OR ABORT `todo_items` SET `id` = ?1, `name` = ?2, \
     `timeInMillis` = ?3, `isMonthly` = ?4, `remindCount` = ?5, `isDone` = ?6, `remarks` = ?7, \
     `imagePaths` = ?8, `maxRetries` = ?9, `retryIntervalHours` = ?10, `repeatMode` = ?11 \
     WHERE `id` = ?12";

const DELETE_SQL: &str = "DELETE FROM `todo_items` WHERE `id` = ?1";

/// Column values of a record, in table declaration order
struct TodoColumns<'a> {
    item: &'a TodoItem,
    is_monthly: i64,
    is_done: i64,
    image_paths: String,
}

impl<'a> TodoColumns<'a> {
    fn extract(item: &'a TodoItem) -> Result<Self> {
        Ok(Self {
            item,
            is_monthly: item.is_monthly as i64,
            is_done: item.is_done as i64,
            image_paths: string_list_to_column(&item.image_paths)?,
        })
    }

    fn values(&self) -> [&dyn ToSql; 11] {
        [
            &self.item.id,
            &self.item.name,
            &self.item.time_in_millis,
            &self.is_monthly,
            &self.item.remind_count,
            &self.is_done,
            &self.item.remarks,
            &self.image_paths,
            &self.item.max_retries,
            &self.item.retry_interval_hours,
            &self.item.repeat_mode,
        ]
    }
}

/// Insert or replace; returns the row id
fn insert_todo(tx: &Transaction<'_>, item: &TodoItem) -> Result<i64> {
    let columns = TodoColumns::extract(item)?;
    let mut stmt = tx.prepare(INSERT_SQL)?;
    stmt.execute(&columns.values()[..])?;
    Ok(tx.last_insert_rowid())
}

/// Full-row update keyed by id; returns rows affected
fn update_todo(tx: &Transaction<'_>, item: &TodoItem) -> Result<usize> {
    let columns = TodoColumns::extract(item)?;
    let values = columns.values();
    let mut params: Vec<&dyn ToSql> = values.to_vec();
    params.push(&item.id);
    let mut stmt = tx.prepare(UPDATE_SQL)?;
    Ok(stmt.execute(&params[..])?)
}

/// Delete keyed by id; returns rows affected
fn delete_todo(tx: &Transaction<'_>, item: &TodoItem) -> Result<usize> {
    let mut stmt = tx.prepare(DELETE_SQL)?;
    Ok(stmt.execute([item.id])?)
}

/// Decode one row selected with [`SELECT_COLUMNS`]
fn row_to_todo(row: &Row<'_>) -> Result<TodoItem> {
    let image_paths: String = row.get(7)?;
    Ok(TodoItem {
        id: row.get(0)?,
        name: row.get(1)?,
        time_in_millis: row.get(2)?,
        is_monthly: row.get::<_, i64>(3)? != 0,
        remind_count: row.get(4)?,
        is_done: row.get::<_, i64>(5)? != 0,
        remarks: row.get(6)?,
        image_paths: string_list_from_column(&image_paths)?,
        max_retries: row.get(8)?,
        retry_interval_hours: row.get(9)?,
        repeat_mode: row.get(10)?,
    })
}

fn query_all(conn: &Connection, token: Option<&CancellationToken>) -> Result<Vec<TodoItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM todo_items ORDER BY timeInMillis ASC",
        SELECT_COLUMNS
    ))?;
    let mut rows = stmt.query([])?;
    let mut todos = Vec::new();
    while let Some(row) = rows.next()? {
        if let Some(token) = token {
            ensure_not_cancelled(token)?;
        }
        todos.push(row_to_todo(row)?);
    }
    Ok(todos)
}

fn query_by_id(conn: &Connection, id: i64) -> Result<Option<TodoItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM todo_items WHERE id = ?1",
        SELECT_COLUMNS
    ))?;
    let row = stmt
        .query_row([id], |row| Ok(row_to_todo(row)))
        .optional()?;
    row.transpose()
}

/// Data access for to-do records.
///
/// Obtain through [`Database::todo_store`](crate::Database::todo_store).
#[derive(Debug, Clone)]
pub struct TodoStore {
    handle: Arc<StorageHandle>,
}

impl TodoStore {
    pub(crate) fn new(handle: Arc<StorageHandle>) -> Self {
        Self { handle }
    }

    /// Insert a record, replacing any row with the same id.
    ///
    /// A record with id 0 is assigned a fresh id, which is returned.
    pub async fn insert(&self, todo: &TodoItem) -> Result<i64> {
        let todo = todo.clone();
        let id = self
            .handle
            .write(TABLES, move |tx| insert_todo(tx, &todo))
            .await?;
        tracing::debug!(id, "Inserted todo");
        Ok(id)
    }

    /// Replace every column of the row with the record's id.
    ///
    /// Fails with [`Error::TodoNotFound`] if no such row exists; nothing is
    /// written in that case.
    pub async fn update(&self, todo: &TodoItem) -> Result<()> {
        let todo = todo.clone();
        self.handle
            .write(TABLES, move |tx| match update_todo(tx, &todo)? {
                0 => Err(Error::TodoNotFound(todo.id)),
                _ => Ok(()),
            })
            .await
    }

    /// Delete the row with the record's id. Deleting a missing row is a no-op.
    pub async fn delete(&self, todo: &TodoItem) -> Result<()> {
        let todo = todo.clone();
        let deleted = self
            .handle
            .write(TABLES, move |tx| delete_todo(tx, &todo))
            .await?;
        tracing::debug!(deleted, "Deleted todo");
        Ok(())
    }

    /// All records ordered by scheduled time, re-emitted after every change
    /// to `todo_items`.
    pub fn get_all_todos(&self) -> LiveQuery<TodoItem> {
        LiveQuery::spawn(Arc::clone(&self.handle), TABLES, |conn| query_all(conn, None))
    }

    /// All records ordered by scheduled time
    pub async fn get_all_todos_list(&self) -> Result<Vec<TodoItem>> {
        self.get_all_todos_list_cancellable(CancellationToken::new()).await
    }

    pub async fn get_all_todos_list_cancellable(
        &self,
        token: CancellationToken,
    ) -> Result<Vec<TodoItem>> {
        self.handle
            .read_cancellable(token, |conn, token| query_all(conn, Some(token)))
            .await
    }

    /// Point lookup; `None` if no row has this id
    pub async fn get_todo_by_id(&self, id: i64) -> Result<Option<TodoItem>> {
        self.get_todo_by_id_cancellable(id, CancellationToken::new()).await
    }

    pub async fn get_todo_by_id_cancellable(
        &self,
        id: i64,
        token: CancellationToken,
    ) -> Result<Option<TodoItem>> {
        self.handle
            .read_cancellable(token, move |conn, _| query_by_id(conn, id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crate::todo::RepeatMode;
    use std::time::Duration;

    fn sample_todo(name: &str, time: i64) -> TodoItem {
        TodoItem::new(name, time)
            .with_remarks("bring receipts")
            .with_images(["/files/img_1.jpg", "/files/img_2.jpg"])
            .with_retries(5, 2)
            .with_repeat(RepeatMode::Monthly)
    }

    fn store() -> TodoStore {
        Database::in_memory().open().unwrap().todo_store().clone()
    }

    async fn next_snapshot(live: &mut LiveQuery<TodoItem>) -> Vec<TodoItem> {
        tokio::time::timeout(Duration::from_secs(5), live.next())
            .await
            .expect("live query should emit")
            .expect("live query should still be running")
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_roundtrips() {
        let store = store();
        let todo = sample_todo("Pay rent", 1_000);

        let id = store.insert(&todo).await.unwrap();
        assert!(id > 0);

        let loaded = store.get_todo_by_id(id).await.unwrap().unwrap();
        assert_eq!(loaded, TodoItem { id, ..todo });
    }

    #[tokio::test]
    async fn test_insert_with_existing_id_replaces() {
        let store = store();
        let id = store.insert(&sample_todo("Old", 1)).await.unwrap();

        let replacement = TodoItem { id, ..TodoItem::new("New", 2) };
        assert_eq!(store.insert(&replacement).await.unwrap(), id);

        let all = store.get_all_todos_list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "New");
    }

    #[tokio::test]
    async fn test_missing_id_is_none() {
        let store = store();
        assert!(store.get_todo_by_id(12345).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_time() {
        let store = store();
        for (name, time) in [("c", 300), ("a", 100), ("d", 400), ("b", 200)] {
            store.insert(&TodoItem::new(name, time)).await.unwrap();
        }

        let first = store.get_all_todos_list().await.unwrap();
        store.delete(&first[1]).await.unwrap();
        let mut moved = first[0].clone();
        moved.time_in_millis = 500;
        store.update(&moved).await.unwrap();

        let names: Vec<String> = store
            .get_all_todos_list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["c", "d", "a"]);
    }

    #[tokio::test]
    async fn test_update_replaces_row() {
        let store = store();
        let id = store.insert(&sample_todo("Pay rent", 1)).await.unwrap();

        let mut todo = store.get_todo_by_id(id).await.unwrap().unwrap();
        todo.is_done = true;
        todo.remind_count = 2;
        todo.image_paths.clear();
        store.update(&todo).await.unwrap();

        assert_eq!(store.get_todo_by_id(id).await.unwrap().unwrap(), todo);
    }

    #[tokio::test]
    async fn test_update_missing_row_fails_without_insert() {
        let store = store();
        let ghost = TodoItem { id: 77, ..sample_todo("Ghost", 1) };

        let err = store.update(&ghost).await.unwrap_err();
        assert!(matches!(err, Error::TodoNotFound(77)));
        assert!(store.get_all_todos_list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_row_is_noop() {
        let store = store();
        store.insert(&sample_todo("Keep", 1)).await.unwrap();

        let ghost = TodoItem { id: 999, ..sample_todo("Ghost", 1) };
        store.delete(&ghost).await.unwrap();
        assert_eq!(store.get_all_todos_list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_live_query_emits_after_each_commit() {
        let store = store();
        let mut live = store.get_all_todos();
        assert!(next_snapshot(&mut live).await.is_empty());

        let id = store.insert(&TodoItem::new("late", 200)).await.unwrap();
        let snapshot = next_snapshot(&mut live).await;
        assert_eq!(snapshot.len(), 1);

        store.insert(&TodoItem::new("early", 100)).await.unwrap();
        let names: Vec<String> = next_snapshot(&mut live).await.into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["early", "late"]);

        let late = store.get_todo_by_id(id).await.unwrap().unwrap();
        store.delete(&late).await.unwrap();
        let snapshot = next_snapshot(&mut live).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "early");
    }

    #[tokio::test]
    async fn test_live_query_ignores_noop_writes() {
        let store = store();
        let mut live = store.get_all_todos();
        next_snapshot(&mut live).await;

        store.delete(&TodoItem { id: 5, ..TodoItem::new("x", 0) }).await.unwrap();
        assert!(
            tokio::time::timeout(Duration::from_millis(100), live.next())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_cancelled_list_read() {
        let store = store();
        store.insert(&TodoItem::new("a", 1)).await.unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let err = store.get_all_todos_list_cancellable(token).await.unwrap_err();
        assert!(err.is_cancelled());

        // The connection is free again after cancellation.
        assert_eq!(store.get_all_todos_list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_repeat_mode_fails_decode() {
        let db = Database::in_memory().open().unwrap();
        let store = db.todo_store();
        let id = store.insert(&TodoItem::new("a", 1)).await.unwrap();

        db.handle()
            .write_blocking(&[TODO_ITEMS], |tx| {
                Ok(tx.execute("UPDATE todo_items SET repeatMode = 9 WHERE id = ?1", [id])?)
            })
            .unwrap();

        assert!(matches!(
            store.get_todo_by_id(id).await,
            Err(Error::Storage(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_during_list_read_frees_connection() {
        let db = Database::in_memory().open().unwrap();
        db.handle()
            .write_blocking(&[TODO_ITEMS], |tx| {
                Ok(tx.execute(
                    "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n WHERE x < 300000) \
                     INSERT INTO todo_items (name, timeInMillis, isMonthly, remindCount, isDone, \
                     remarks, imagePaths, maxRetries, retryIntervalHours, repeatMode) \
                     SELECT 'row ' || x, x, 0, 0, 0, '', '[\"/files/img.jpg\"]', 3, 1, 0 FROM n",
                    [],
                )?)
            })
            .unwrap();
        let store = db.todo_store().clone();

        let token = CancellationToken::new();
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                token.cancel();
            })
        };

        let err = store.get_all_todos_list_cancellable(token).await.unwrap_err();
        assert!(err.is_cancelled());
        canceller.await.unwrap();

        let first = store.get_todo_by_id(1).await.unwrap().unwrap();
        assert_eq!(first.name, "row 1");
        assert_eq!(first.image_paths, vec!["/files/img.jpg".to_string()]);
    }

    mod properties {
        use std::collections::BTreeMap;

        use proptest::prelude::*;

        use crate::storage::Database;
        use crate::todo::TodoItem;

        #[derive(Debug, Clone)]
        enum Op {
            Insert { name: String, time: i64 },
            Update { pick: usize, time: i64, done: bool },
            Delete { pick: usize },
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                ("[a-z ]{1,8}", 0i64..50).prop_map(|(name, time)| Op::Insert { name, time }),
                (any::<usize>(), 0i64..50, any::<bool>())
                    .prop_map(|(pick, time, done)| Op::Update { pick, time, done }),
                any::<usize>().prop_map(|pick| Op::Delete { pick }),
            ]
        }

        fn pick_id(model: &BTreeMap<i64, TodoItem>, pick: usize) -> Option<i64> {
            if model.is_empty() {
                return None;
            }
            model.keys().nth(pick % model.len()).copied()
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn test_list_matches_model_after_any_ops(
                ops in prop::collection::vec(op_strategy(), 0..40)
            ) {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();

                runtime.block_on(async {
                    let db = Database::in_memory().open().unwrap();
                    let store = db.todo_store();
                    let mut model: BTreeMap<i64, TodoItem> = BTreeMap::new();

                    for op in ops {
                        match op {
                            Op::Insert { name, time } => {
                                let todo = TodoItem::new(name, time);
                                let id = store.insert(&todo).await.unwrap();
                                model.insert(id, TodoItem { id, ..todo });
                            }
                            Op::Update { pick, time, done } => {
                                let Some(id) = pick_id(&model, pick) else { continue };
                                let mut todo = model[&id].clone();
                                todo.time_in_millis = time;
                                todo.is_done = done;
                                store.update(&todo).await.unwrap();
                                model.insert(id, todo);
                            }
                            Op::Delete { pick } => {
                                let Some(id) = pick_id(&model, pick) else { continue };
                                if let Some(todo) = model.remove(&id) {
                                    store.delete(&todo).await.unwrap();
                                }
                            }
                        }
                    }

                    let listed = store.get_all_todos_list().await.unwrap();
                    assert!(
                        listed
                            .windows(2)
                            .all(|w| w[0].time_in_millis <= w[1].time_in_millis)
                    );

                    let mut by_id = listed;
                    by_id.sort_by_key(|t| t.id);
                    assert_eq!(by_id, model.into_values().collect::<Vec<_>>());
                });
            }
        }
    }
}
