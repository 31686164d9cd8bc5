//! Schema migrations between versions

use std::fmt;

use rusqlite::Transaction;

use crate::Result;

type MigrationFn = Box<dyn Fn(&Transaction<'_>) -> Result<()> + Send + Sync>;

/// A step that upgrades (or downgrades) the schema from one version to another
pub struct Migration {
    pub from: u32,
    pub to: u32,
    apply: MigrationFn,
}

impl Migration {
    pub fn new<F>(from: u32, to: u32, apply: F) -> Self
    where
        F: Fn(&Transaction<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            from,
            to,
            apply: Box::new(apply),
        }
    }

    /// A migration consisting of plain SQL statements
    pub fn sql(from: u32, to: u32, statements: &'static [&'static str]) -> Self {
        Self::new(from, to, move |tx| {
            for stmt in statements {
                tx.execute_batch(stmt)?;
            }
            Ok(())
        })
    }

    pub fn apply(&self, tx: &Transaction<'_>) -> Result<()> {
        (self.apply)(tx)
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

/// Find a chain of migrations leading from `from` to `to`.
///
/// At each step the migration that gets furthest toward the target without
/// overshooting it is taken. Returns `None` if the chain breaks off, and an
/// empty chain when the versions are equal.
pub fn find_path(migrations: &[Migration], from: u32, to: u32) -> Option<Vec<&Migration>> {
    let upgrading = to > from;
    let mut path = Vec::new();
    let mut current = from;

    while current != to {
        let next = migrations
            .iter()
            .filter(|m| m.from == current)
            .filter(|m| {
                if upgrading {
                    m.to > current && m.to <= to
                } else {
                    m.to < current && m.to >= to
                }
            })
            .max_by_key(|m| if upgrading { m.to } else { u32::MAX - m.to })?;
        path.push(next);
        current = next.to;
    }

    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(from: u32, to: u32) -> Migration {
        Migration::new(from, to, |_| Ok(()))
    }

    fn steps(path: &[&Migration]) -> Vec<(u32, u32)> {
        path.iter().map(|m| (m.from, m.to)).collect()
    }

    #[test]
    fn test_prefers_longest_jump() {
        let migrations = vec![noop(1, 2), noop(2, 3), noop(1, 3), noop(3, 4)];
        let path = find_path(&migrations, 1, 4).unwrap();
        assert_eq!(steps(&path), vec![(1, 3), (3, 4)]);
    }

    #[test]
    fn test_never_overshoots() {
        let migrations = vec![noop(1, 2), noop(1, 5)];
        let path = find_path(&migrations, 1, 2).unwrap();
        assert_eq!(steps(&path), vec![(1, 2)]);
    }

    #[test]
    fn test_broken_chain() {
        let migrations = vec![noop(1, 2)];
        assert!(find_path(&migrations, 1, 3).is_none());
        assert!(find_path(&migrations, 3, 1).is_none());
    }

    #[test]
    fn test_downgrade_path() {
        let migrations = vec![noop(3, 2), noop(2, 1), noop(3, 1)];
        let path = find_path(&migrations, 3, 1).unwrap();
        assert_eq!(steps(&path), vec![(3, 1)]);
    }

    #[test]
    fn test_same_version_is_empty_path() {
        assert!(find_path(&[], 2, 2).unwrap().is_empty());
    }
}
