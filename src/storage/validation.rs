//! Live schema inspection and comparison against the declared tables

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rusqlite::Connection;

use super::schema::{Affinity, TableDef};
use crate::{Error, Result};

/// Structure of one column as SQLite reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub affinity: Affinity,
    pub not_null: bool,
    pub primary_key_position: u32,
}

impl fmt::Display for ColumnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.affinity)?;
        if self.not_null {
            write!(f, " NOT NULL")?;
        }
        if self.primary_key_position > 0 {
            write!(f, " PK#{}", self.primary_key_position)?;
        }
        Ok(())
    }
}

/// Structure of a table, keyed by column name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub columns: BTreeMap<String, ColumnInfo>,
}

impl TableInfo {
    /// The structure a declared table should have once created
    pub fn expected(def: &TableDef) -> Self {
        let columns = def
            .columns
            .iter()
            .map(|c| {
                (
                    c.name.to_string(),
                    ColumnInfo {
                        name: c.name.to_string(),
                        affinity: c.affinity,
                        not_null: c.not_null,
                        primary_key_position: c.primary_key_position,
                    },
                )
            })
            .collect();
        Self {
            name: def.name.to_string(),
            columns,
        }
    }

    /// Read the live structure of `table`. A missing table has no columns.
    pub fn read(conn: &Connection, table: &str) -> Result<Self> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info(`{}`)", table))?;
        let columns = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let declared: String = row.get::<_, Option<String>>(2)?.unwrap_or_default();
                let not_null: i64 = row.get(3)?;
                let pk: i64 = row.get(5)?;
                Ok(ColumnInfo {
                    name,
                    affinity: Affinity::from_declared_type(&declared),
                    not_null: not_null != 0,
                    primary_key_position: pk as u32,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Self {
            name: table.to_string(),
            columns: columns.into_iter().map(|c| (c.name.clone(), c)).collect(),
        })
    }

    /// Column names that are missing, extra, or differ from `other`
    pub fn differing_columns(&self, other: &TableInfo) -> Vec<String> {
        self.columns
            .keys()
            .chain(other.columns.keys())
            .filter(|name| self.columns.get(*name) != other.columns.get(*name))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl fmt::Display for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, column) in self.columns.values().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", column)?;
        }
        write!(f, ")")
    }
}

/// Compare every declared table against the live database
pub fn validate_tables(conn: &Connection, tables: &[TableDef]) -> Result<()> {
    for def in tables {
        let expected = TableInfo::expected(def);
        let found = TableInfo::read(conn, def.name)?;
        if expected != found {
            tracing::debug!(
                table = def.name,
                columns = ?expected.differing_columns(&found),
                "Schema mismatch"
            );
            return Err(Error::SchemaValidation {
                table: def.name.to_string(),
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
    }
    Ok(())
}
