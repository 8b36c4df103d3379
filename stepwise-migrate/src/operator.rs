//! Manual schema store remediation
//!
//! A `dirty` record never heals on its own. Once an operator has repaired
//! the database by hand, these operations rewrite or remove the record so
//! the next `up` / `down` sees the real state.

use anyhow::Context;
use chrono::Utc;
use clap::ValueEnum;
use stepwise::context::MigrationContext;
use stepwise::migration::{SchemaRecord, SchemaStatus};
use stepwise::store::SchemaStore;

/// Status accepted by `resolve --status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Applied,
    Dirty,
    InProgress,
}

impl From<StatusArg> for SchemaStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Applied => SchemaStatus::Applied,
            StatusArg::Dirty => SchemaStatus::Dirty,
            StatusArg::InProgress => SchemaStatus::InProgress,
        }
    }
}

/// What to do with one version's record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Write the record with this status, creating it if needed
    SetStatus(SchemaStatus),
    /// Remove the record so the version counts as never attempted
    Delete,
}

/// Every record in the store, ordered by version
///
/// # Errors
///
/// Returns the store error.
pub fn list_records<S: SchemaStore>(
    store: &S,
    ctx: &MigrationContext,
) -> anyhow::Result<Vec<SchemaRecord>> {
    store
        .list(ctx)
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to list schema records")
}

/// Apply `resolution` to the record for `version`
///
/// # Errors
///
/// Returns an error for an empty version or when the store write fails.
pub fn resolve<S: SchemaStore>(
    store: &S,
    ctx: &MigrationContext,
    version: &str,
    resolution: Resolution,
) -> anyhow::Result<()> {
    anyhow::ensure!(!version.is_empty(), "a version is required");

    let previous = store
        .find(ctx, version)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("failed to read schema record {version}"))?;

    match resolution {
        Resolution::SetStatus(status) => {
            store
                .upsert(ctx, &SchemaRecord::new(version, status, Utc::now()))
                .map_err(|e| anyhow::anyhow!(e))
                .with_context(|| format!("failed to write schema record {version}"))?;
            log::warn!(
                "Schema record {version} manually set to {status} (was {})",
                previous.map_or("absent".to_string(), |r| r.status.to_string())
            );
        }
        Resolution::Delete => {
            if previous.is_none() {
                log::info!("Schema record {version} does not exist, nothing to delete");
                return Ok(());
            }
            store
                .delete(ctx, version)
                .map_err(|e| anyhow::anyhow!(e))
                .with_context(|| format!("failed to delete schema record {version}"))?;
            log::warn!("Schema record {version} manually deleted");
        }
    }
    Ok(())
}
