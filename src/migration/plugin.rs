//! `SchemaPlugin` - the capability set a datastore adapter provides to the migrator

use super::{Migration, MigrationError, SchemaRecord};
use crate::context::MigrationContext;
use std::sync::Arc;

/// Datastore adapter driven by a [`Migrator`](super::Migrator)
///
/// There is no default implementation: a migrator is always built around an
/// explicit adapter value. Most adapters only need to persist records and
/// can implement [`SchemaStore`](crate::store::SchemaStore) instead, wrapping
/// it in [`StorePlugin`](crate::store::StorePlugin), which carries the status
/// protocol described on [`apply_migration`](Self::apply_migration) and
/// [`revert_migration`](Self::revert_migration).
pub trait SchemaPlugin {
    /// Connect and make sure the schema store exists
    ///
    /// Calling it more than once must not duplicate setup side effects.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Connect` when the store cannot be reached or
    /// prepared.
    fn connect(&self, ctx: &MigrationContext) -> Result<(), MigrationError>;

    /// Current record for `version`, `Ok(None)` when it was never attempted
    ///
    /// # Errors
    ///
    /// Returns an error only when the store could not answer; a missing
    /// record is not an error.
    fn get_schema(
        &self,
        ctx: &MigrationContext,
        version: &str,
    ) -> Result<Option<SchemaRecord>, MigrationError>;

    /// Write an `in_progress` record, run `up`, then mark `applied` or `dirty`
    ///
    /// # Errors
    ///
    /// Returns the operation failure, or a compounded
    /// `MigrationError::StatusTransition` when the `dirty` write also failed.
    fn apply_migration(
        &self,
        ctx: &MigrationContext,
        migration: &Migration,
    ) -> Result<(), MigrationError>;

    /// Run `down`, then delete the record, or mark it `dirty` on failure
    ///
    /// # Errors
    ///
    /// Returns the operation failure (the record stays, marked `dirty`), or a
    /// record-write error naming the manual fix.
    fn revert_migration(
        &self,
        ctx: &MigrationContext,
        migration: &Migration,
    ) -> Result<(), MigrationError>;
}

macro_rules! forward_plugin {
    ($($ty:ty),*) => {$(
        impl<P: SchemaPlugin + ?Sized> SchemaPlugin for $ty {
            fn connect(&self, ctx: &MigrationContext) -> Result<(), MigrationError> {
                (**self).connect(ctx)
            }

            fn get_schema(
                &self,
                ctx: &MigrationContext,
                version: &str,
            ) -> Result<Option<SchemaRecord>, MigrationError> {
                (**self).get_schema(ctx, version)
            }

            fn apply_migration(
                &self,
                ctx: &MigrationContext,
                migration: &Migration,
            ) -> Result<(), MigrationError> {
                (**self).apply_migration(ctx, migration)
            }

            fn revert_migration(
                &self,
                ctx: &MigrationContext,
                migration: &Migration,
            ) -> Result<(), MigrationError> {
                (**self).revert_migration(ctx, migration)
            }
        }
    )*};
}

forward_plugin!(&P, Box<P>, Arc<P>);
