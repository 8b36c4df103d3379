//! # Stepwise
//!
//! Versioned up/down schema migrations with a pluggable schema record store.
//!
//! A [`Migrator`] walks an ordered list of [`Migration`]s and consults a
//! [`SchemaPlugin`] for the persisted state of each version
//! (`in_progress`, `applied`, `dirty`). The engine keeps no state of its own,
//! so interrupted runs resume from whatever the store records.
//!
//! - [`migration`]: migrations, the engine and the plugin contract
//! - [`store`]: the record protocol over any [`store::SchemaStore`], plus an in-memory store
//! - [`postgres`]: the PostgreSQL store (`may_postgres`) and DDL helpers
//! - [`config`]: rc file and environment settings
//! - [`context`]: cancellation and deadlines for every operation

pub mod config;
pub mod context;
pub mod executor;
pub mod migration;
pub mod postgres;
pub mod store;

pub use config::StepwiseConfig;
pub use context::MigrationContext;
pub use migration::{
    BoxError, Direction, Migration, MigrationError, MigrationStatus, Migrator, SchemaPlugin,
    SchemaRecord, SchemaStatus,
};
pub use postgres::{PostgresPlugin, PostgresStore};
pub use store::{MemoryStore, SchemaStore, StorePlugin};
