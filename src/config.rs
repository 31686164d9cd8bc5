use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::{Database, DatabaseBuilder};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TododbConfig {
    pub database: Option<String>,
    pub fallback_to_destructive_migration: bool,
    pub wal: bool,
    pub busy_timeout_ms: u64,
}

impl Default for TododbConfig {
    fn default() -> Self {
        Self {
            database: None,
            fallback_to_destructive_migration: true,
            wal: true,
            busy_timeout_ms: 5000,
        }
    }
}

impl TododbConfig {
    /// Database builder for `path` with this configuration applied
    pub fn builder(&self, path: impl Into<PathBuf>) -> DatabaseBuilder {
        let builder = Database::builder(path)
            .wal(self.wal)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms));
        if self.fallback_to_destructive_migration {
            builder.fallback_to_destructive_migration()
        } else {
            builder
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("tododb.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".tododb").join("todo_database.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<TododbConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: TododbConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &TododbConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tododb.toml");
        let config = TododbConfig {
            database: Some("data/todo.db".to_string()),
            wal: false,
            ..TododbConfig::default()
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.database.as_deref(), Some("data/todo.db"));
        assert!(!loaded.wal);
        assert!(loaded.fallback_to_destructive_migration);
        assert_eq!(loaded.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: TododbConfig = toml::from_str("wal = false").unwrap();
        assert!(config.database.is_none());
        assert!(!config.wal);
        assert!(config.fallback_to_destructive_migration);
    }

    #[test]
    fn test_default_database_path() {
        let path = default_database_path_in(Path::new("/home/me"));
        assert_eq!(path, Path::new("/home/me/.tododb/todo_database.db"));
    }
}
