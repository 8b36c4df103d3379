//! Migration system for Stepwise
//!
//! This module provides the migration orchestration core:
//! - [`Migration`] definitions (a version plus `up`/`down` operations)
//! - the [`SchemaPlugin`] contract every datastore adapter implements
//! - [`SchemaRecord`] / [`SchemaStatus`], the persisted per-version state
//! - the [`Migrator`] engine driving `up` and `down` traversals
//!
//! # Example
//!
//! ```rust,no_run
//! use stepwise::config::StepwiseConfig;
//! use stepwise::context::MigrationContext;
//! use stepwise::migration::{Migration, Migrator};
//! use stepwise::postgres::PostgresPlugin;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StepwiseConfig::load(None)?;
//!     let plugin = PostgresPlugin::from_config(&config)?;
//!
//!     let mut migrator = Migrator::new(plugin);
//!     migrator.register(Migration::new(
//!         "202510152146",
//!         |_ctx| Ok(()), // create the users table
//!         |_ctx| Ok(()), // drop it
//!     ));
//!
//!     let ctx = MigrationContext::new();
//!     migrator.connect(&ctx)?;
//!     migrator.up(&ctx, None)?;
//!     Ok(())
//! }
//! ```

pub mod error;
#[allow(clippy::module_inception)]
pub mod migration;
pub mod migrator;
pub mod plugin;
pub mod record;
pub mod status;

pub use error::{BoxError, MigrationError};
pub use migration::{Direction, Migration, MutationFn};
pub use migrator::Migrator;
pub use plugin::SchemaPlugin;
pub use record::{ParseStatusError, SchemaRecord, SchemaStatus};
pub use status::{MigrationState, MigrationStatus};
