//! SchemaManager - DDL helpers for migration operations

use crate::context::MigrationContext;
use crate::executor::{MayPostgresExecutor, SqlError, SqlExecutor};
use may_postgres::types::ToSql;
use sea_query::{
    ColumnDef, IndexCreateStatement, IndexDropStatement, PostgresQueryBuilder, Table,
    TableAlterStatement, TableCreateStatement, TableDropStatement,
};

/// Runs schema statements inside migration operations
///
/// Every call checks the [`MigrationContext`] first, so a cancelled run
/// stops before the next statement reaches the database.
///
/// ```rust,no_run
/// use sea_query::{ColumnDef, Table};
/// use stepwise::postgres::SchemaManager;
/// use stepwise::{Migration, MigrationContext};
///
/// # fn demo(manager: SchemaManager) {
/// let up = manager.clone();
/// let down = manager.clone();
/// let migration = Migration::new(
///     "20240101000000",
///     move |ctx: &MigrationContext| {
///         let table = Table::create()
///             .table("users")
///             .col(ColumnDef::new("id").big_integer().not_null().primary_key())
///             .to_owned();
///         up.create_table(ctx, table)?;
///         Ok(())
///     },
///     move |ctx: &MigrationContext| {
///         down.drop_table(ctx, Table::drop().table("users").to_owned())?;
///         Ok(())
///     },
/// );
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SchemaManager<E = MayPostgresExecutor> {
    executor: E,
}

impl<E: SqlExecutor> SchemaManager<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn create_table(
        &self,
        ctx: &MigrationContext,
        table: TableCreateStatement,
    ) -> Result<(), SqlError> {
        self.run(ctx, &table.build(PostgresQueryBuilder))
    }

    pub fn drop_table(
        &self,
        ctx: &MigrationContext,
        table: TableDropStatement,
    ) -> Result<(), SqlError> {
        self.run(ctx, &table.build(PostgresQueryBuilder))
    }

    pub fn alter_table(
        &self,
        ctx: &MigrationContext,
        alter: TableAlterStatement,
    ) -> Result<(), SqlError> {
        self.run(ctx, &alter.build(PostgresQueryBuilder))
    }

    pub fn create_index(
        &self,
        ctx: &MigrationContext,
        index: IndexCreateStatement,
    ) -> Result<(), SqlError> {
        self.run(ctx, &index.build(PostgresQueryBuilder))
    }

    pub fn drop_index(
        &self,
        ctx: &MigrationContext,
        index: IndexDropStatement,
    ) -> Result<(), SqlError> {
        self.run(ctx, &index.build(PostgresQueryBuilder))
    }

    /// Add a column to an existing table
    pub fn add_column(
        &self,
        ctx: &MigrationContext,
        table: &str,
        column: ColumnDef,
    ) -> Result<(), SqlError> {
        let alter = Table::alter()
            .table(table.to_string())
            .add_column(column)
            .to_owned();
        self.alter_table(ctx, alter)
    }

    /// Drop a column from an existing table
    pub fn drop_column(
        &self,
        ctx: &MigrationContext,
        table: &str,
        column: &str,
    ) -> Result<(), SqlError> {
        let alter = Table::alter()
            .table(table.to_string())
            .drop_column(column.to_string())
            .to_owned();
        self.alter_table(ctx, alter)
    }

    /// Execute raw SQL, for anything the statement builders don't cover
    ///
    /// ```rust,no_run
    /// # fn demo(
    /// #     manager: stepwise::postgres::SchemaManager,
    /// #     ctx: &stepwise::MigrationContext,
    /// # ) -> Result<(), stepwise::executor::SqlError> {
    /// manager.execute(ctx, "CREATE EXTENSION IF NOT EXISTS pgcrypto", &[])?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn execute(
        &self,
        ctx: &MigrationContext,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> Result<u64, SqlError> {
        self.executor.execute_in(ctx, sql, params)
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn run(&self, ctx: &MigrationContext, sql: &str) -> Result<(), SqlError> {
        log::debug!("Executing schema statement: {sql}");
        self.executor.execute_in(ctx, sql, &[]).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::MigrationError;
    use may_postgres::Row;
    use sea_query::{Expr, Index};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        statements: RefCell<Vec<String>>,
    }

    impl SqlExecutor for Recorder {
        fn execute(&self, query: &str, _params: &[&dyn ToSql]) -> Result<u64, SqlError> {
            self.statements.borrow_mut().push(query.to_string());
            Ok(0)
        }

        fn query_all(&self, _query: &str, _params: &[&dyn ToSql]) -> Result<Vec<Row>, SqlError> {
            Ok(Vec::new())
        }
    }

    fn statements(manager: &SchemaManager<Recorder>) -> Vec<String> {
        manager.executor().statements.borrow().clone()
    }

    #[test]
    fn test_create_and_drop_table() {
        let manager = SchemaManager::new(Recorder::default());
        let ctx = MigrationContext::new();
        let table = Table::create()
            .table("users")
            .if_not_exists()
            .col(ColumnDef::new("id").integer().not_null().primary_key())
            .to_owned();
        manager.create_table(&ctx, table).unwrap();
        manager
            .drop_table(&ctx, Table::drop().table("users").to_owned())
            .unwrap();

        let sql = statements(&manager);
        assert_eq!(sql.len(), 2);
        assert!(sql[0].starts_with(r#"CREATE TABLE IF NOT EXISTS "users""#));
        assert_eq!(sql[1], r#"DROP TABLE "users""#);
    }

    #[test]
    fn test_column_helpers() {
        let manager = SchemaManager::new(Recorder::default());
        let ctx = MigrationContext::new();
        manager
            .add_column(&ctx, "users", ColumnDef::new("nickname").text().null().to_owned())
            .unwrap();
        manager.drop_column(&ctx, "users", "nickname").unwrap();

        let sql = statements(&manager);
        assert!(sql[0].starts_with(r#"ALTER TABLE "users" ADD COLUMN "nickname""#));
        assert_eq!(sql[1], r#"ALTER TABLE "users" DROP COLUMN "nickname""#);
    }

    #[test]
    fn test_index_helpers() {
        let manager = SchemaManager::new(Recorder::default());
        let ctx = MigrationContext::new();
        let create = Index::create()
            .name("idx_users_email")
            .table("users")
            .col(Expr::col("email"))
            .to_owned();
        manager.create_index(&ctx, create).unwrap();
        manager
            .drop_index(&ctx, Index::drop().name("idx_users_email").to_owned())
            .unwrap();

        let sql = statements(&manager);
        assert!(sql[0].contains(r#"CREATE INDEX "idx_users_email""#));
        assert!(sql[1].contains(r#"DROP INDEX "idx_users_email""#));
    }

    #[test]
    fn test_cancelled_context_skips_statement() {
        let manager = SchemaManager::new(Recorder::default());
        let ctx = MigrationContext::new();
        ctx.cancel();
        let err = manager.execute(&ctx, "SELECT 1", &[]).unwrap_err();
        assert!(matches!(err, SqlError::Context(MigrationError::Cancelled)));
        assert!(statements(&manager).is_empty());
    }
}
