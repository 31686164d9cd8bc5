//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - todo_items(id, name, timeInMillis, isMonthly, remindCount, isDone, remarks,
//!   imagePaths, maxRetries, retryIntervalHours, repeatMode)
//! - app_logs(id, timestamp, tag, message)
//! - schema_master(id, identity_hash)

pub mod schema;
pub mod validation;
pub mod migration;
pub mod invalidation;
pub mod handle;
pub mod live;
pub mod todo_store;
pub mod log_store;
pub mod database;

pub use database::{Database, DatabaseBuilder};
pub use live::LiveQuery;
pub use log_store::LogStore;
pub use migration::Migration;
pub use todo_store::TodoStore;
