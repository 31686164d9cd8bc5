//! To-do record types
//!
//! A `TodoItem` is one row of the `todo_items` table. Booleans are stored as
//! integers 0/1, the image path list as JSON text, and the repeat mode as an
//! integer code.

use crate::{Error, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a to-do recurs once it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Fires once
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl RepeatMode {
    /// Integer code persisted in the `repeatMode` column
    pub fn code(&self) -> i32 {
        match self {
            RepeatMode::None => 0,
            RepeatMode::Daily => 1,
            RepeatMode::Weekly => 2,
            RepeatMode::Monthly => 3,
        }
    }

    /// Decode a persisted integer code
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(RepeatMode::None),
            1 => Some(RepeatMode::Daily),
            2 => Some(RepeatMode::Weekly),
            3 => Some(RepeatMode::Monthly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::None => "none",
            RepeatMode::Daily => "daily",
            RepeatMode::Weekly => "weekly",
            RepeatMode::Monthly => "monthly",
        }
    }

    /// Get all repeat modes
    pub fn all() -> &'static [RepeatMode] {
        &[
            RepeatMode::None,
            RepeatMode::Daily,
            RepeatMode::Weekly,
            RepeatMode::Monthly,
        ]
    }
}

impl FromStr for RepeatMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" | "once" | "never" => Ok(RepeatMode::None),
            "daily" | "day" => Ok(RepeatMode::Daily),
            "weekly" | "week" => Ok(RepeatMode::Weekly),
            "monthly" | "month" => Ok(RepeatMode::Monthly),
            _ => Err(Error::InvalidRepeatMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for RepeatMode {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for RepeatMode {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let code = value.as_i64()?;
        RepeatMode::from_code(code).ok_or(FromSqlError::OutOfRange(code))
    }
}

/// A to-do record.
///
/// An `id` of 0 means "not yet assigned": inserting such a record lets the
/// database pick the next identity value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: i64,
    pub name: String,
    /// Scheduled time, epoch milliseconds
    pub time_in_millis: i64,
    pub is_monthly: bool,
    pub remind_count: i32,
    pub is_done: bool,
    pub remarks: String,
    /// Local paths of attached images, in display order
    pub image_paths: Vec<String>,
    pub max_retries: i32,
    pub retry_interval_hours: i32,
    pub repeat_mode: RepeatMode,
}

impl TodoItem {
    pub const DEFAULT_MAX_RETRIES: i32 = 3;
    pub const DEFAULT_RETRY_INTERVAL_HOURS: i32 = 1;

    /// Create an unsaved to-do with the application defaults
    pub fn new(name: impl Into<String>, time_in_millis: i64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            time_in_millis,
            is_monthly: false,
            remind_count: 0,
            is_done: false,
            remarks: String::new(),
            image_paths: Vec::new(),
            max_retries: Self::DEFAULT_MAX_RETRIES,
            retry_interval_hours: Self::DEFAULT_RETRY_INTERVAL_HOURS,
            repeat_mode: RepeatMode::None,
        }
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = remarks.into();
        self
    }

    pub fn with_images<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_retries(mut self, max_retries: i32, retry_interval_hours: i32) -> Self {
        self.max_retries = max_retries;
        self.retry_interval_hours = retry_interval_hours;
        self
    }

    /// Set the repeat mode; `Monthly` also sets the monthly flag
    pub fn with_repeat(mut self, mode: RepeatMode) -> Self {
        self.repeat_mode = mode;
        self.is_monthly = mode == RepeatMode::Monthly;
        self
    }

    /// True once the record has been persisted and assigned an identity
    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }
}
