//! Migration definition

use super::error::BoxError;
use crate::context::MigrationContext;
use std::fmt;
use std::sync::Arc;

/// Forward or backward operation carried by a [`Migration`]
///
/// Operations receive the traversal's [`MigrationContext`] and should call
/// `ctx.check()?` between long-running statements so cancellation is honoured.
pub type MutationFn = Arc<dyn Fn(&MigrationContext) -> Result<(), BoxError> + Send + Sync>;

/// Direction in which a migration is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Apply the migration (forward)
    Up,
    /// Revert the migration (backward)
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => f.write_str("up"),
            Direction::Down => f.write_str("down"),
        }
    }
}

/// A versioned pair of forward and backward operations
///
/// Migrations are assembled once at startup and registered with a
/// [`Migrator`](super::Migrator) in the order they must be applied.
/// Cloning is cheap: the operations are shared.
///
/// # Example
///
/// ```rust
/// use stepwise::migration::Migration;
///
/// let create_users = Migration::new(
///     "202510152146",
///     |ctx| {
///         ctx.check()?;
///         // CREATE TABLE users ...
///         Ok(())
///     },
///     |_ctx| {
///         // DROP TABLE users
///         Ok(())
///     },
/// );
/// assert_eq!(create_users.version(), "202510152146");
/// ```
#[derive(Clone)]
pub struct Migration {
    version: String,
    up: MutationFn,
    down: MutationFn,
}

impl Migration {
    /// Create a migration from a version and its two operations
    pub fn new<U, D>(version: impl Into<String>, up: U, down: D) -> Self
    where
        U: Fn(&MigrationContext) -> Result<(), BoxError> + Send + Sync + 'static,
        D: Fn(&MigrationContext) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            version: version.into(),
            up: Arc::new(up),
            down: Arc::new(down),
        }
    }

    /// The migration version (timestamp-like, e.g. `YYYYMMDDHHMM`)
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Run the forward operation
    ///
    /// # Errors
    ///
    /// Returns whatever the operation returns.
    pub fn up(&self, ctx: &MigrationContext) -> Result<(), BoxError> {
        (self.up)(ctx)
    }

    /// Run the backward operation
    ///
    /// # Errors
    ///
    /// Returns whatever the operation returns.
    pub fn down(&self, ctx: &MigrationContext) -> Result<(), BoxError> {
        (self.down)(ctx)
    }

    /// Run the operation for `direction`
    ///
    /// # Errors
    ///
    /// Returns whatever the operation returns.
    pub fn run(&self, direction: Direction, ctx: &MigrationContext) -> Result<(), BoxError> {
        match direction {
            Direction::Up => self.up(ctx),
            Direction::Down => self.down(ctx),
        }
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_run_dispatches_by_direction() {
        let ups = Arc::new(AtomicUsize::new(0));
        let downs = Arc::new(AtomicUsize::new(0));
        let (u, d) = (Arc::clone(&ups), Arc::clone(&downs));
        let migration = Migration::new(
            "1",
            move |_| {
                u.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            move |_| {
                d.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );
        let ctx = MigrationContext::new();

        migration.run(Direction::Up, &ctx).unwrap();
        migration.run(Direction::Up, &ctx).unwrap();
        migration.run(Direction::Down, &ctx).unwrap();

        assert_eq!(ups.load(Ordering::SeqCst), 2);
        assert_eq!(downs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_operation_error_is_returned() {
        let migration = Migration::new("1", |_| Err("boom".into()), |_| Ok(()));
        let err = migration.up(&MigrationContext::new()).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_clone_shares_operations() {
        let migration = Migration::new("20240101_initial", |_| Ok(()), |_| Ok(()));
        let copy = migration.clone();
        assert_eq!(copy.version(), "20240101_initial");
        assert!(format!("{copy:?}").contains("20240101_initial"));
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Up.to_string(), "up");
        assert_eq!(Direction::Down.to_string(), "down");
    }
}
