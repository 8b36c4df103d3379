//! Schema record stores and the status protocol built on top of them
//!
//! A [`SchemaStore`] only knows how to persist [`SchemaRecord`]s.
//! [`StorePlugin`] turns any store into a [`SchemaPlugin`] by running the
//! `in_progress` → `applied` / `dirty` protocol around each migration, so
//! adapters don't each re-implement the failure handling.

pub mod memory;

pub use memory::{MemoryStore, MemoryStoreError, StoreOp};

use crate::context::MigrationContext;
use crate::migration::{
    BoxError, Direction, Migration, MigrationError, SchemaPlugin, SchemaRecord, SchemaStatus,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Persistence primitives for schema records
///
/// Implementations should call `ctx.check()` before touching the backend.
pub trait SchemaStore {
    /// Create the backing table/collection (and its uniqueness constraint on
    /// `version`) if it does not exist yet
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    fn ensure(&self, ctx: &MigrationContext) -> Result<(), BoxError>;

    /// Record for `version`, `Ok(None)` if absent
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    fn find(&self, ctx: &MigrationContext, version: &str) -> Result<Option<SchemaRecord>, BoxError>;

    /// Every record, ordered by version
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    fn list(&self, ctx: &MigrationContext) -> Result<Vec<SchemaRecord>, BoxError>;

    /// Insert `record`, overwriting any record with the same version
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    fn upsert(&self, ctx: &MigrationContext, record: &SchemaRecord) -> Result<(), BoxError>;

    /// Change the status (and timestamp) of an existing record
    ///
    /// # Errors
    ///
    /// Returns the backend error, or an error if no record exists for
    /// `version`.
    fn set_status(
        &self,
        ctx: &MigrationContext,
        version: &str,
        status: SchemaStatus,
        at: DateTime<Utc>,
    ) -> Result<(), BoxError>;

    /// Remove the record for `version`; removing an absent record is not an error
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    fn delete(&self, ctx: &MigrationContext, version: &str) -> Result<(), BoxError>;
}

macro_rules! forward_store {
    ($($ty:ty),*) => {$(
        impl<S: SchemaStore + ?Sized> SchemaStore for $ty {
            fn ensure(&self, ctx: &MigrationContext) -> Result<(), BoxError> {
                (**self).ensure(ctx)
            }

            fn find(&self, ctx: &MigrationContext, version: &str) -> Result<Option<SchemaRecord>, BoxError> {
                (**self).find(ctx, version)
            }

            fn list(&self, ctx: &MigrationContext) -> Result<Vec<SchemaRecord>, BoxError> {
                (**self).list(ctx)
            }

            fn upsert(&self, ctx: &MigrationContext, record: &SchemaRecord) -> Result<(), BoxError> {
                (**self).upsert(ctx, record)
            }

            fn set_status(
                &self,
                ctx: &MigrationContext,
                version: &str,
                status: SchemaStatus,
                at: DateTime<Utc>,
            ) -> Result<(), BoxError> {
                (**self).set_status(ctx, version, status, at)
            }

            fn delete(&self, ctx: &MigrationContext, version: &str) -> Result<(), BoxError> {
                (**self).delete(ctx, version)
            }
        }
    )*};
}

forward_store!(&S, Box<S>, Arc<S>);

/// [`SchemaPlugin`] implemented over a [`SchemaStore`]
#[derive(Debug, Clone)]
pub struct StorePlugin<S> {
    store: S,
}

impl<S: SchemaStore> StorePlugin<S> {
    /// Wrap a store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The wrapped store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unwrap the store
    pub fn into_inner(self) -> S {
        self.store
    }

    /// Try to mark `version` dirty after `failure`; compound the errors if
    /// that write fails too
    fn mark_dirty(
        &self,
        ctx: &MigrationContext,
        version: &str,
        failure: MigrationError,
    ) -> MigrationError {
        log::warn!("Migration {version} failed, marking it dirty: {failure}");
        match self.store.set_status(ctx, version, SchemaStatus::Dirty, Utc::now()) {
            Ok(()) => failure,
            Err(source) => {
                let err = MigrationError::StatusTransition {
                    version: version.to_string(),
                    status: SchemaStatus::Dirty,
                    source,
                    operation: Some(Box::new(failure)),
                };
                log::error!("{err}");
                err
            }
        }
    }

    fn run_operation(
        &self,
        ctx: &MigrationContext,
        migration: &Migration,
        direction: Direction,
    ) -> Result<(), MigrationError> {
        migration.run(direction, ctx).map_err(|source| {
            let failure = MigrationError::Operation {
                version: migration.version().to_string(),
                direction,
                source,
            };
            self.mark_dirty(ctx, migration.version(), failure)
        })
    }
}

impl<S: SchemaStore> SchemaPlugin for StorePlugin<S> {
    fn connect(&self, ctx: &MigrationContext) -> Result<(), MigrationError> {
        ctx.check()?;
        self.store
            .ensure(ctx)
            .map_err(|source| MigrationError::Connect { source })
    }

    fn get_schema(
        &self,
        ctx: &MigrationContext,
        version: &str,
    ) -> Result<Option<SchemaRecord>, MigrationError> {
        ctx.check()?;
        self.store.find(ctx, version).map_err(MigrationError::Store)
    }

    fn apply_migration(
        &self,
        ctx: &MigrationContext,
        migration: &Migration,
    ) -> Result<(), MigrationError> {
        ctx.check()?;
        let version = migration.version();
        self.store
            .upsert(ctx, &SchemaRecord::in_progress(version))
            .map_err(|source| MigrationError::RecordCreate {
                version: version.to_string(),
                source,
            })?;

        self.run_operation(ctx, migration, Direction::Up)?;

        self.store
            .set_status(ctx, version, SchemaStatus::Applied, Utc::now())
            .map_err(|source| MigrationError::StatusTransition {
                version: version.to_string(),
                status: SchemaStatus::Applied,
                source,
                operation: None,
            })
    }

    fn revert_migration(
        &self,
        ctx: &MigrationContext,
        migration: &Migration,
    ) -> Result<(), MigrationError> {
        ctx.check()?;
        let version = migration.version();

        self.run_operation(ctx, migration, Direction::Down)?;

        self.store
            .delete(ctx, version)
            .map_err(|source| MigrationError::RecordDelete {
                version: version.to_string(),
                source,
            })
    }
}
