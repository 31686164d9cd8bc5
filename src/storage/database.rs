//! Database bootstrap
//!
//! Opens the SQLite file, brings its schema to [`SCHEMA_VERSION`] (create,
//! migrate, or destructively recreate), validates it, and hands out the
//! lazily-built stores that share the one connection.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tokio::sync::OnceCell;

use super::handle::StorageHandle;
use super::log_store::LogStore;
use super::migration::{find_path, Migration};
use super::schema::{self, MASTER_ROW_ID, SCHEMA_VERSION, TABLES};
use super::todo_store::TodoStore;
use super::validation::validate_tables;
use crate::{Error, Result};

static SHARED: OnceCell<Database> = OnceCell::const_new();

/// Options for opening a [`Database`]
#[derive(Debug)]
pub struct DatabaseBuilder {
    path: Option<PathBuf>,
    migrations: Vec<Migration>,
    fallback_to_destructive_migration: bool,
    wal: bool,
    busy_timeout: Duration,
}

impl DatabaseBuilder {
    fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            migrations: Vec::new(),
            fallback_to_destructive_migration: false,
            wal: true,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Register a migration step
    pub fn add_migration(mut self, migration: Migration) -> Self {
        self.migrations.push(migration);
        self
    }

    /// Drop and recreate all tables when no migration path exists
    pub fn fallback_to_destructive_migration(mut self) -> Self {
        self.fallback_to_destructive_migration = true;
        self
    }

    /// Use write-ahead logging for file databases (default on)
    pub fn wal(mut self, enabled: bool) -> Self {
        self.wal = enabled;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Open the database, running schema creation, migration and
    /// validation as needed. Blocks; see [`open_async`](Self::open_async).
    pub fn open(self) -> Result<Database> {
        let mut conn = match &self.path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                Connection::open(path)?
            }
            None => Connection::open_in_memory()?,
        };

        self.configure(&conn)?;
        let version = self.prepare_schema(&mut conn)?;

        tracing::info!(
            path = %self.path.as_deref().map_or_else(|| ":memory:".into(), |p| p.display().to_string()),
            version,
            "Database opened"
        );

        Ok(Database {
            handle: Arc::new(StorageHandle::new(conn)),
            path: self.path,
            todo_store: Arc::new(OnceLock::new()),
            log_store: Arc::new(OnceLock::new()),
        })
    }

    /// [`open`](Self::open) on the blocking pool
    pub async fn open_async(self) -> Result<Database> {
        tokio::task::spawn_blocking(move || self.open()).await?
    }

    fn configure(&self, conn: &Connection) -> Result<()> {
        conn.busy_timeout(self.busy_timeout)?;
        if self.wal && self.path.is_some() {
            let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            tracing::debug!(mode, "Journal mode set");
        }
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    /// Bring the schema to the current version; returns the version found on
    /// disk before opening.
    fn prepare_schema(&self, conn: &mut Connection) -> Result<u32> {
        let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        let tx = conn.transaction()?;

        if version == 0 {
            let empty = has_empty_schema(&tx)?;
            create_all_tables(&tx)?;
            if empty {
                tracing::info!(version = SCHEMA_VERSION, "Created database schema");
            } else {
                validate_tables(&tx, TABLES)?;
            }
            write_identity(&tx)?;
        } else if version != SCHEMA_VERSION {
            match find_path(&self.migrations, version, SCHEMA_VERSION) {
                Some(path) => {
                    for migration in path {
                        tracing::info!(from = migration.from, to = migration.to, "Running migration");
                        migration.apply(&tx)?;
                    }
                    validate_tables(&tx, TABLES)?;
                    write_identity(&tx)?;
                }
                None if self.fallback_to_destructive_migration => {
                    tracing::warn!(
                        from = version,
                        to = SCHEMA_VERSION,
                        "No migration path, recreating all tables"
                    );
                    drop_all_tables(&tx)?;
                    create_all_tables(&tx)?;
                    write_identity(&tx)?;
                }
                None => {
                    return Err(Error::MigrationRequired {
                        from: version,
                        to: SCHEMA_VERSION,
                    });
                }
            }
        } else {
            check_identity(&tx)?;
        }

        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tx.commit()?;
        Ok(version)
    }
}

fn has_empty_schema(conn: &Connection) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count == 0)
}

fn create_all_tables(tx: &Transaction<'_>) -> Result<()> {
    for stmt in schema::all_schema_statements() {
        tx.execute(&stmt, [])?;
    }
    Ok(())
}

fn drop_all_tables(tx: &Transaction<'_>) -> Result<()> {
    for table in TABLES {
        tx.execute(&table.drop_sql(), [])?;
    }
    Ok(())
}

fn write_identity(tx: &Transaction<'_>) -> Result<()> {
    tx.execute(schema::CREATE_MASTER_TABLE, [])?;
    tx.execute(
        "INSERT OR REPLACE INTO schema_master (id, identity_hash) VALUES (?1, ?2)",
        params![MASTER_ROW_ID, schema::identity_hash()],
    )?;
    Ok(())
}

fn read_identity(conn: &Connection) -> Result<Option<String>> {
    let has_master: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        [schema::MASTER_TABLE],
        |row| row.get(0),
    )?;
    if !has_master {
        return Ok(None);
    }
    let hash = conn
        .query_row(
            "SELECT identity_hash FROM schema_master WHERE id = ?1",
            [MASTER_ROW_ID],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?
        .flatten();
    Ok(hash)
}

/// Same version on disk: trust a matching identity hash, otherwise validate
fn check_identity(tx: &Transaction<'_>) -> Result<()> {
    let expected = schema::identity_hash();
    match read_identity(tx)? {
        Some(found) if found == expected => Ok(()),
        Some(found) => Err(Error::IdentityMismatch { expected, found }),
        None => {
            validate_tables(tx, TABLES)?;
            write_identity(tx)
        }
    }
}

/// Handle to an opened database.
///
/// Cloning is cheap; clones share the connection and the store instances.
#[derive(Debug, Clone)]
pub struct Database {
    handle: Arc<StorageHandle>,
    path: Option<PathBuf>,
    todo_store: Arc<OnceLock<TodoStore>>,
    log_store: Arc<OnceLock<LogStore>>,
}

impl Database {
    /// Start configuring a file-backed database
    pub fn builder(path: impl Into<PathBuf>) -> DatabaseBuilder {
        DatabaseBuilder::new(Some(path.into()))
    }

    /// Start configuring an in-memory database (for testing)
    pub fn in_memory() -> DatabaseBuilder {
        DatabaseBuilder::new(None)
    }

    /// The process-wide database. The first caller's builder opens it;
    /// concurrent and later callers receive the same instance and their
    /// builders are discarded.
    pub async fn shared(builder: DatabaseBuilder) -> Result<&'static Database> {
        SHARED.get_or_try_init(|| builder.open_async()).await
    }

    /// The process-wide database, if [`shared`](Self::shared) has opened it
    pub fn try_shared() -> Option<&'static Database> {
        SHARED.get()
    }

    pub fn todo_store(&self) -> &TodoStore {
        self.todo_store
            .get_or_init(|| TodoStore::new(Arc::clone(&self.handle)))
    }

    pub fn log_store(&self) -> &LogStore {
        self.log_store
            .get_or_init(|| LogStore::new(Arc::clone(&self.handle)))
    }

    /// Database file path, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema_version(&self) -> u32 {
        SCHEMA_VERSION
    }

    pub fn identity_hash(&self) -> String {
        schema::identity_hash()
    }

    #[cfg(test)]
    pub(crate) fn handle(&self) -> &Arc<StorageHandle> {
        &self.handle
    }

    /// Delete every row of every table, then checkpoint the write-ahead log
    /// and compact the file.
    pub async fn clear_all_tables(&self) -> Result<()> {
        let handle = Arc::clone(&self.handle);
        let tables = schema::tracked_tables();
        tokio::task::spawn_blocking(move || {
            handle.write_blocking(&tables, |tx| {
                for table in TABLES {
                    tx.execute(&format!("DELETE FROM `{}`", table.name), [])?;
                }
                Ok(())
            })?;
            handle.with_connection(|conn| {
                conn.query_row("PRAGMA wal_checkpoint(FULL)", [], |_| Ok(()))?;
                if conn.is_autocommit() {
                    conn.execute_batch("VACUUM")?;
                }
                Ok(())
            })
        })
        .await??;
        tracing::info!("Cleared all tables");
        Ok(())
    }
}
