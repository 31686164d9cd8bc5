//! Database schema definitions
//!
//! Each table is declared once as a [`TableDef`]. The `CREATE TABLE`
//! statement, the structure expected by validation and the schema identity
//! hash are all derived from these declarations.

/// Schema version stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 2;

pub const TODO_ITEMS: &str = "todo_items";
pub const APP_LOGS: &str = "app_logs";

/// Table holding the schema identity marker row
pub const MASTER_TABLE: &str = "schema_master";

/// Primary key of the single row in [`MASTER_TABLE`]
pub const MASTER_ROW_ID: i64 = 42;

pub const CREATE_MASTER_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS schema_master (id INTEGER PRIMARY KEY, identity_hash TEXT)";

/// SQLite column type affinity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affinity {
    Integer,
    Text,
    Real,
    Blob,
    Numeric,
}

impl Affinity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Affinity::Integer => "INTEGER",
            Affinity::Text => "TEXT",
            Affinity::Real => "REAL",
            Affinity::Blob => "BLOB",
            Affinity::Numeric => "NUMERIC",
        }
    }

    /// Resolve the affinity of a declared column type using SQLite's rules
    pub fn from_declared_type(declared: &str) -> Self {
        let upper = declared.to_uppercase();
        if upper.contains("INT") {
            Affinity::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Affinity::Text
        } else if upper.is_empty() || upper.contains("BLOB") {
            Affinity::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Affinity::Real
        } else {
            Affinity::Numeric
        }
    }
}

impl std::fmt::Display for Affinity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A declared column
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub affinity: Affinity,
    pub not_null: bool,
    /// 1-based position within the primary key, 0 if not part of it
    pub primary_key_position: u32,
    pub autoincrement: bool,
}

impl ColumnDef {
    const fn required(name: &'static str, affinity: Affinity) -> Self {
        Self {
            name,
            affinity,
            not_null: true,
            primary_key_position: 0,
            autoincrement: false,
        }
    }

    const fn identity(name: &'static str) -> Self {
        Self {
            name,
            affinity: Affinity::Integer,
            not_null: true,
            primary_key_position: 1,
            autoincrement: true,
        }
    }

    fn sql(&self) -> String {
        let mut sql = format!("`{}` {}", self.name, self.affinity);
        if self.primary_key_position > 0 {
            sql.push_str(" PRIMARY KEY");
            if self.autoincrement {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        sql
    }
}

/// A declared table
#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(ColumnDef::sql).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS `{}` ({})",
            self.name,
            columns.join(", ")
        )
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS `{}`", self.name)
    }
}

pub const TODO_ITEMS_TABLE: TableDef = TableDef {
    name: TODO_ITEMS,
    columns: &[
        ColumnDef::identity("id"),
        ColumnDef::required("name", Affinity::Text),
        ColumnDef::required("timeInMillis", Affinity::Integer),
        ColumnDef::required("isMonthly", Affinity::Integer),
        ColumnDef::required("remindCount", Affinity::Integer),
        ColumnDef::required("isDone", Affinity::Integer),
        ColumnDef::required("remarks", Affinity::Text),
        ColumnDef::required("imagePaths", Affinity::Text),
        ColumnDef::required("maxRetries", Affinity::Integer),
        ColumnDef::required("retryIntervalHours", Affinity::Integer),
        ColumnDef::required("repeatMode", Affinity::Integer),
    ],
};

pub const APP_LOGS_TABLE: TableDef = TableDef {
    name: APP_LOGS,
    columns: &[
        ColumnDef::identity("id"),
        ColumnDef::required("timestamp", Affinity::Integer),
        ColumnDef::required("tag", Affinity::Text),
        ColumnDef::required("message", Affinity::Text),
    ],
};

/// All application tables, in creation order
pub const TABLES: &[TableDef] = &[TODO_ITEMS_TABLE, APP_LOGS_TABLE];

/// Names of the tables tracked for invalidation
pub fn tracked_tables() -> Vec<&'static str> {
    TABLES.iter().map(|t| t.name).collect()
}

/// All schema creation statements
pub fn all_schema_statements() -> Vec<String> {
    let mut stmts: Vec<String> = TABLES.iter().map(TableDef::create_sql).collect();
    stmts.push(CREATE_MASTER_TABLE.to_string());
    stmts
}

/// Fingerprint of the declared schema, stored in the marker row
pub fn identity_hash() -> String {
    let mut hasher = blake3::Hasher::new();
    for table in TABLES {
        hasher.update(table.create_sql().as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().as_str()[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_todo_create_sql_has_all_columns() {
        let sql = TODO_ITEMS_TABLE.create_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `todo_items`"));
        assert!(sql.contains("`id` INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL"));
        assert!(sql.contains("`repeatMode` INTEGER NOT NULL"));
        assert_eq!(TODO_ITEMS_TABLE.columns.len(), 11);
        assert_eq!(APP_LOGS_TABLE.columns.len(), 4);
    }

    #[test]
    fn test_affinity_rules() {
        assert_eq!(Affinity::from_declared_type("BIGINT"), Affinity::Integer);
        assert_eq!(Affinity::from_declared_type("varchar(20)"), Affinity::Text);
        assert_eq!(Affinity::from_declared_type(""), Affinity::Blob);
        assert_eq!(Affinity::from_declared_type("DOUBLE"), Affinity::Real);
        assert_eq!(Affinity::from_declared_type("DECIMAL"), Affinity::Numeric);
    }

    #[test]
    fn test_identity_hash_is_stable() {
        assert_eq!(identity_hash(), identity_hash());
        assert_eq!(identity_hash().len(), 32);
    }
}
