//! `SqlExecutor` - the statement-level seam between the Postgres store and `may_postgres`

use crate::context::MigrationContext;
use crate::migration::MigrationError;
use may_postgres::types::ToSql;
use may_postgres::{Client, Error as PostgresError, Row};
use thiserror::Error;

/// `SqlExecutor` error type
#[derive(Debug, Error)]
pub enum SqlError {
    /// `PostgreSQL` error from `may_postgres`
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] PostgresError),
    /// Row parsing/conversion error
    #[error("Parse error: {0}")]
    Parse(String),
    /// The context was cancelled before the statement ran
    #[error(transparent)]
    Context(#[from] MigrationError),
}

/// Trait for executing SQL statements
///
/// The schema store and [`SchemaManager`](crate::postgres::SchemaManager)
/// only talk to the database through this trait.
pub trait SqlExecutor {
    /// Execute a statement and return the number of rows affected
    ///
    /// # Errors
    ///
    /// Returns `SqlError` if the statement fails.
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, SqlError>;

    /// Execute a query and return all rows
    ///
    /// # Errors
    ///
    /// Returns `SqlError` if the query fails.
    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, SqlError>;

    /// Execute a statement after checking that `ctx` is still live
    ///
    /// # Errors
    ///
    /// Returns `SqlError::Context` when the context is cancelled.
    fn execute_in(
        &self,
        ctx: &MigrationContext,
        query: &str,
        params: &[&dyn ToSql],
    ) -> Result<u64, SqlError> {
        ctx.check()?;
        self.execute(query, params)
    }

    /// Run a query after checking that `ctx` is still live
    ///
    /// # Errors
    ///
    /// Returns `SqlError::Context` when the context is cancelled.
    fn query_all_in(
        &self,
        ctx: &MigrationContext,
        query: &str,
        params: &[&dyn ToSql],
    ) -> Result<Vec<Row>, SqlError> {
        ctx.check()?;
        self.query_all(query, params)
    }
}

/// Implementation of `SqlExecutor` for `may_postgres::Client`
#[derive(Clone)]
pub struct MayPostgresExecutor {
    client: Client,
}

impl MayPostgresExecutor {
    /// Create a new executor from a `may_postgres::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Consume the executor and return the underlying client
    pub fn into_client(self) -> Client {
        self.client
    }
}

impl SqlExecutor for MayPostgresExecutor {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, SqlError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("stepwise.sql", query).entered();

        self.client.execute(query, params).map_err(SqlError::Postgres)
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, SqlError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!("stepwise.sql", query).entered();

        self.client.query(query, params).map_err(SqlError::Postgres)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records statements instead of running them
    #[derive(Default)]
    struct Recorder {
        statements: RefCell<Vec<String>>,
    }

    impl SqlExecutor for Recorder {
        fn execute(&self, query: &str, _params: &[&dyn ToSql]) -> Result<u64, SqlError> {
            self.statements.borrow_mut().push(query.to_string());
            Ok(1)
        }

        fn query_all(&self, query: &str, _params: &[&dyn ToSql]) -> Result<Vec<Row>, SqlError> {
            self.statements.borrow_mut().push(query.to_string());
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_execute_in_checks_context() {
        let recorder = Recorder::default();
        let ctx = MigrationContext::new();
        assert_eq!(recorder.execute_in(&ctx, "SELECT 1", &[]).unwrap(), 1);

        ctx.cancel();
        let err = recorder.execute_in(&ctx, "SELECT 2", &[]).unwrap_err();
        assert!(matches!(err, SqlError::Context(MigrationError::Cancelled)));
        assert!(recorder.query_all_in(&ctx, "SELECT 3", &[]).is_err());
        assert_eq!(*recorder.statements.borrow(), ["SELECT 1"]);
    }

    #[test]
    fn test_sql_error_display() {
        let err = SqlError::Parse("bad status".to_string());
        assert_eq!(err.to_string(), "Parse error: bad status");
        let err = SqlError::from(MigrationError::DeadlineExceeded);
        assert_eq!(err.to_string(), "migration deadline exceeded");
    }
}
