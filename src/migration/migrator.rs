//! Migrator - Core migration execution engine

use super::record::is_attempted;
use super::status::{MigrationState, MigrationStatus};
use super::{Migration, MigrationError, SchemaPlugin};
use crate::context::MigrationContext;

/// Core migration execution engine
///
/// The `Migrator` owns the ordered list of migrations and a [`SchemaPlugin`].
/// It keeps no bookkeeping of its own: every decision to skip, apply or
/// revert is read back from the schema store, so re-running `up` or `down`
/// after a crash resumes where the store says execution stopped.
///
/// Migrations run in registration order. Sorting them (usually by their
/// timestamp version) is the caller's job.
///
/// # Example
///
/// ```rust
/// use stepwise::context::MigrationContext;
/// use stepwise::migration::{Migration, Migrator};
/// use stepwise::store::{MemoryStore, StorePlugin};
///
/// # fn main() -> Result<(), stepwise::migration::MigrationError> {
/// let migrator = Migrator::with_migrations(
///     StorePlugin::new(MemoryStore::new()),
///     vec![
///         Migration::new("202401010000", |_| Ok(()), |_| Ok(())),
///         Migration::new("202402010000", |_| Ok(()), |_| Ok(())),
///     ],
/// );
///
/// let ctx = MigrationContext::new();
/// migrator.connect(&ctx)?;
/// assert_eq!(migrator.up(&ctx, None)?, 2);
/// assert_eq!(migrator.down(&ctx, "202401010000")?, 2);
/// # Ok(())
/// # }
/// ```
pub struct Migrator<P> {
    plugin: P,
    migrations: Vec<Migration>,
}

impl<P: SchemaPlugin> Migrator<P> {
    /// Create a migrator with no migrations registered
    pub fn new(plugin: P) -> Self {
        Self {
            plugin,
            migrations: Vec::new(),
        }
    }

    /// Create a migrator from an already ordered list of migrations
    pub fn with_migrations(plugin: P, migrations: impl IntoIterator<Item = Migration>) -> Self {
        Self {
            plugin,
            migrations: migrations.into_iter().collect(),
        }
    }

    /// Append a migration; it runs after every migration registered before it
    pub fn register(&mut self, migration: Migration) -> &mut Self {
        self.migrations.push(migration);
        self
    }

    /// Registered migrations in traversal order
    #[must_use]
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// The underlying plugin
    #[must_use]
    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    /// Connect the plugin to its schema store
    ///
    /// # Errors
    ///
    /// Propagates the plugin's connection error.
    pub fn connect(&self, ctx: &MigrationContext) -> Result<(), MigrationError> {
        ctx.check()?;
        self.plugin.connect(ctx)
    }

    /// Index of `version` in the registration order (linear scan)
    fn position(&self, version: &str) -> Option<usize> {
        self.migrations.iter().position(|m| m.version() == version)
    }

    /// Reject lists where a version appears twice
    fn ensure_unique(&self) -> Result<(), MigrationError> {
        for (i, migration) in self.migrations.iter().enumerate() {
            if self.migrations[..i].iter().any(|m| m.version() == migration.version()) {
                return Err(MigrationError::DuplicateVersion(migration.version().to_string()));
            }
        }
        Ok(())
    }

    /// Resolve the target index once per call
    fn target_index(&self, version: &str) -> Result<usize, MigrationError> {
        self.position(version)
            .ok_or_else(|| MigrationError::VersionNotFound(version.to_string()))
    }

    fn fetch_attempted(
        &self,
        ctx: &MigrationContext,
        migration: &Migration,
    ) -> Result<bool, MigrationError> {
        let record = self
            .plugin
            .get_schema(ctx, migration.version())
            .map_err(|e| MigrationError::FetchSchema {
                version: migration.version().to_string(),
                source: Box::new(e),
            })?;
        Ok(is_attempted(record.as_ref()))
    }

    /// Apply pending migrations, stopping once `to_version` has been applied
    ///
    /// With `None` (or an empty string) every migration whose record is
    /// absent or `in_progress` is applied. Versions already `applied` or
    /// `dirty` are skipped; skipping `to_version` itself does not end the
    /// traversal, only applying it does.
    ///
    /// # Returns
    ///
    /// Returns the number of migrations applied.
    ///
    /// # Errors
    ///
    /// - `VersionNotFound` / `DuplicateVersion` before any store access
    /// - `FetchSchema` when a record cannot be read
    /// - `Apply` wrapping the plugin error when a migration fails; later
    ///   migrations are not touched
    pub fn up(
        &self,
        ctx: &MigrationContext,
        to_version: Option<&str>,
    ) -> Result<usize, MigrationError> {
        let to_version = to_version.filter(|v| !v.is_empty());
        self.ensure_unique()?;
        if let Some(version) = to_version {
            self.target_index(version)?;
        }

        let mut applied = 0;
        for migration in &self.migrations {
            ctx.check()?;
            if self.fetch_attempted(ctx, migration)? {
                log::debug!("Skipping migration {} (already attempted)", migration.version());
                continue;
            }

            #[cfg(feature = "tracing")]
            let _span = tracing::info_span!("stepwise.apply", version = %migration.version()).entered();

            self.plugin
                .apply_migration(ctx, migration)
                .map_err(|e| MigrationError::Apply {
                    version: migration.version().to_string(),
                    source: Box::new(e),
                })?;
            log::info!("Applied migration {}", migration.version());
            applied += 1;

            if to_version == Some(migration.version()) {
                break;
            }
        }

        if applied == 0 {
            log::debug!("No pending migrations to apply");
        }
        Ok(applied)
    }

    /// Revert migrations newest first, stopping once `at_version` has been
    /// reverted
    ///
    /// Migrations are visited in reverse registration order. Only versions
    /// whose record is `applied` or `dirty` are reverted. When `at_version`
    /// itself is skipped the walk carries on towards the first migration;
    /// reaching it without reverting `at_version` is not an error.
    ///
    /// # Returns
    ///
    /// Returns the number of migrations reverted.
    ///
    /// # Errors
    ///
    /// - `VersionRequired` when `at_version` is empty
    /// - `VersionNotFound` / `DuplicateVersion` before any store access
    /// - `FetchSchema` when a record cannot be read
    /// - `Revert` wrapping the plugin error when a migration fails
    pub fn down(&self, ctx: &MigrationContext, at_version: &str) -> Result<usize, MigrationError> {
        if at_version.is_empty() {
            return Err(MigrationError::VersionRequired);
        }
        self.ensure_unique()?;
        self.target_index(at_version)?;

        let mut reverted = 0;
        for migration in self.migrations.iter().rev() {
            ctx.check()?;
            if !self.fetch_attempted(ctx, migration)? {
                log::debug!("Skipping migration {} (not applied)", migration.version());
                continue;
            }

            #[cfg(feature = "tracing")]
            let _span = tracing::info_span!("stepwise.revert", version = %migration.version()).entered();

            self.plugin
                .revert_migration(ctx, migration)
                .map_err(|e| MigrationError::Revert {
                    version: migration.version().to_string(),
                    source: Box::new(e),
                })?;
            log::info!("Reverted migration {}", migration.version());
            reverted += 1;

            if migration.version() == at_version {
                break;
            }
        }
        Ok(reverted)
    }

    /// Per-migration status as currently recorded in the schema store
    ///
    /// # Errors
    ///
    /// Returns `FetchSchema` when a record cannot be read.
    pub fn status(&self, ctx: &MigrationContext) -> Result<MigrationStatus, MigrationError> {
        let mut states = Vec::with_capacity(self.migrations.len());
        for migration in &self.migrations {
            ctx.check()?;
            let record = self
                .plugin
                .get_schema(ctx, migration.version())
                .map_err(|e| MigrationError::FetchSchema {
                    version: migration.version().to_string(),
                    source: Box::new(e),
                })?;
            states.push(MigrationState::new(migration.version(), record));
        }
        Ok(MigrationStatus::new(states))
    }
}

impl<P> std::fmt::Debug for Migrator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("migrations", &self.migrations)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SchemaStore, StorePlugin};
    use std::sync::Arc;

    fn noop(version: &str) -> Migration {
        Migration::new(version, |_| Ok(()), |_| Ok(()))
    }

    fn migrator(versions: &[&str]) -> (Arc<MemoryStore>, Migrator<StorePlugin<Arc<MemoryStore>>>) {
        let store = Arc::new(MemoryStore::new());
        let migrator = Migrator::with_migrations(
            StorePlugin::new(Arc::clone(&store)),
            versions.iter().map(|v| noop(v)),
        );
        (store, migrator)
    }

    #[test]
    fn test_position_is_linear_scan_over_registration_order() {
        let (_, m) = migrator(&["20240301_c", "20240101_a", "20240201_b"]);
        assert_eq!(m.position("20240101_a"), Some(1));
        assert_eq!(m.position("20240401_nonexistent"), None);
        assert_eq!(m.position(""), None);
    }

    #[test]
    fn test_duplicate_versions_rejected() {
        let (store, m) = migrator(&["1", "2", "1"]);
        let ctx = MigrationContext::new();
        let err = m.up(&ctx, None).unwrap_err();
        assert!(matches!(err, MigrationError::DuplicateVersion(ref v) if v == "1"));
        assert!(store.is_empty());
        assert!(matches!(m.down(&ctx, "2"), Err(MigrationError::DuplicateVersion(_))));
    }

    #[test]
    fn test_register_appends_in_order() {
        let mut m = Migrator::new(StorePlugin::new(MemoryStore::new()));
        m.register(noop("1")).register(noop("2"));
        let versions: Vec<_> = m.migrations().iter().map(Migration::version).collect();
        assert_eq!(versions, ["1", "2"]);
    }

    #[test]
    fn test_up_with_empty_string_means_all() {
        let (store, m) = migrator(&["1", "2"]);
        let ctx = MigrationContext::new();
        assert_eq!(m.up(&ctx, Some("")).unwrap(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_up_continues_past_skipped_target() {
        let (store, m) = migrator(&["1", "2", "3"]);
        let ctx = MigrationContext::new();
        m.up(&ctx, Some("1")).unwrap();
        assert!(store.get("2").is_none());

        assert_eq!(m.up(&ctx, Some("1")).unwrap(), 2);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_down_continues_past_skipped_target() {
        let (store, m) = migrator(&["1", "2", "3"]);
        let ctx = MigrationContext::new();
        m.up(&ctx, None).unwrap();
        store.delete(&ctx, "2").unwrap();

        assert_eq!(m.down(&ctx, "2").unwrap(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_cancelled_context_stops_before_store_access() {
        let (store, m) = migrator(&["1"]);
        let ctx = MigrationContext::new();
        ctx.cancel();
        let err = m.up(&ctx, None).unwrap_err();
        assert!(err.is_cancelled());
        assert!(store.is_empty());
    }

    #[test]
    fn test_status_reports_each_migration() {
        let (_, m) = migrator(&["1", "2"]);
        let ctx = MigrationContext::new();
        m.up(&ctx, Some("1")).unwrap();
        let status = m.status(&ctx).unwrap();
        assert_eq!(status.applied_count, 1);
        assert_eq!(status.pending_count, 1);
        assert_eq!(status.next_pending_version(), Some("2"));
    }
}
