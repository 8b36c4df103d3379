//! Migration-specific error types

use super::migration::Direction;
use super::record::SchemaStatus;
use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error returned by migration operations and schema stores
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Migration-specific errors
///
/// Variants fall into four groups: usage errors reported before anything
/// touches the store (`VersionRequired`, `VersionNotFound`,
/// `DuplicateVersion`), cancellation (`Cancelled`, `DeadlineExceeded`),
/// store failures (`Connect`, `Store`, `FetchSchema`) and migration failures
/// (`Operation`, `Apply`, `Revert`). The record-write variants
/// (`RecordCreate`, `StatusTransition`, `RecordDelete`) leave a record that
/// needs manual attention and say so in their message.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// `down` was called without a target version
    #[error("a version is required")]
    VersionRequired,

    /// The requested target version is not registered
    #[error("version {0} does not exist")]
    VersionNotFound(String),

    /// Two registered migrations share a version
    #[error("version {0} is registered more than once")]
    DuplicateVersion(String),

    /// The context was cancelled
    #[error("migration cancelled")]
    Cancelled,

    /// The context deadline passed
    #[error("migration deadline exceeded")]
    DeadlineExceeded,

    /// The plugin could not connect to or prepare the schema store
    #[error("failed to connect to the schema store: {source}")]
    Connect {
        #[source]
        source: BoxError,
    },

    /// The schema store failed to answer a query
    #[error("schema store error: {0}")]
    Store(#[source] BoxError),

    /// Fetching the schema record for a version failed during a traversal
    #[error("failed to get schema at version {version}: {source}")]
    FetchSchema {
        version: String,
        #[source]
        source: Box<MigrationError>,
    },

    /// Applying a migration failed during `up`
    #[error("failed to apply migration {version}: {source}")]
    Apply {
        version: String,
        #[source]
        source: Box<MigrationError>,
    },

    /// Reverting a migration failed during `down`
    #[error("failed to revert migration {version}: {source}")]
    Revert {
        version: String,
        #[source]
        source: Box<MigrationError>,
    },

    /// The user-supplied forward or backward operation returned an error
    #[error("migration {version} {direction} operation failed: {source}")]
    Operation {
        version: String,
        direction: Direction,
        #[source]
        source: BoxError,
    },

    /// The `in_progress` record could not be written before running `up`
    #[error("failed to record migration {version} as in progress: {source}")]
    RecordCreate {
        version: String,
        #[source]
        source: BoxError,
    },

    /// A status write failed; `operation` holds the migration failure that
    /// triggered the write, if any
    ///
    /// [`source`](StdError::source) is the store error. The migration
    /// failure is not part of that chain; read it with
    /// [`operation_error`](MigrationError::operation_error) or from the
    /// `operation` field. Both appear in the message.
    #[error(
        "failed to update schema status at version: {version}, please manually update it with '{status}' then try again: {source}{}",
        operation_suffix(.operation)
    )]
    StatusTransition {
        version: String,
        status: SchemaStatus,
        #[source]
        source: BoxError,
        operation: Option<Box<MigrationError>>,
    },

    /// The record could not be removed after a successful `down`
    #[error("failed to delete schema at version: {version}, please manually delete it: {source}")]
    RecordDelete {
        version: String,
        #[source]
        source: BoxError,
    },
}

fn operation_suffix(operation: &Option<Box<MigrationError>>) -> String {
    match operation {
        Some(err) => format!("; migration error: {err}"),
        None => String::new(),
    }
}

fn boxed_is_cancelled(err: &(dyn StdError + Send + Sync + 'static)) -> bool {
    err.downcast_ref::<MigrationError>()
        .is_some_and(MigrationError::is_cancelled)
}

impl MigrationError {
    /// Whether the error was caused by context cancellation or a deadline
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            MigrationError::Cancelled | MigrationError::DeadlineExceeded => true,
            MigrationError::FetchSchema { source, .. }
            | MigrationError::Apply { source, .. }
            | MigrationError::Revert { source, .. } => source.is_cancelled(),
            MigrationError::StatusTransition { source, operation, .. } => {
                boxed_is_cancelled(&**source)
                    || operation.as_ref().is_some_and(|op| op.is_cancelled())
            }
            MigrationError::Connect { source }
            | MigrationError::Store(source)
            | MigrationError::Operation { source, .. }
            | MigrationError::RecordCreate { source, .. }
            | MigrationError::RecordDelete { source, .. } => boxed_is_cancelled(&**source),
            MigrationError::VersionRequired
            | MigrationError::VersionNotFound(_)
            | MigrationError::DuplicateVersion(_) => false,
        }
    }

    /// Whether the error is a usage error raised before any store access
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            MigrationError::VersionRequired
                | MigrationError::VersionNotFound(_)
                | MigrationError::DuplicateVersion(_)
        )
    }

    /// The error returned by the user's `up`/`down` operation, if that is
    /// what failed
    ///
    /// Looks through `Apply`/`Revert` wrappers and into the `operation` of a
    /// compounded [`StatusTransition`](MigrationError::StatusTransition),
    /// which [`source`](StdError::source) does not reach.
    #[must_use]
    pub fn operation_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            MigrationError::Operation { source, .. } => Some(&**source),
            MigrationError::Apply { source, .. } | MigrationError::Revert { source, .. } => {
                source.operation_error()
            }
            MigrationError::StatusTransition { operation, .. } => {
                operation.as_ref().and_then(|op| op.operation_error())
            }
            _ => None,
        }
    }

    /// Version the failure relates to, when known
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        match self {
            MigrationError::VersionNotFound(v) | MigrationError::DuplicateVersion(v) => Some(v),
            MigrationError::FetchSchema { version, .. }
            | MigrationError::Apply { version, .. }
            | MigrationError::Revert { version, .. }
            | MigrationError::Operation { version, .. }
            | MigrationError::RecordCreate { version, .. }
            | MigrationError::StatusTransition { version, .. }
            | MigrationError::RecordDelete { version, .. } => Some(version),
            _ => None,
        }
    }
}
