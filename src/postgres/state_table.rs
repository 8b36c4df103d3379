//! Schema store table definition and statements

use once_cell::sync::Lazy;
use regex::Regex;
use sea_query::{Alias, ColumnDef, PostgresQueryBuilder, Table, TableCreateStatement};

/// Default table name for the schema store
pub const DEFAULT_SCHEMA_STORE: &str = "schema_migrations";

static IDENTIFIER: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$"));

/// Whether `name` can be used unescaped as a PostgreSQL table name
///
/// Only plain identifiers (letters, digits, underscores, at most 63 bytes)
/// are accepted because the name is interpolated into every statement.
#[must_use]
pub fn is_valid_table_name(name: &str) -> bool {
    IDENTIFIER.as_ref().is_ok_and(|re| re.is_match(name))
}

/// `CREATE TABLE IF NOT EXISTS` for the schema store
///
/// `version` is the primary key, which is the uniqueness constraint the
/// status protocol relies on.
#[must_use]
pub fn create_state_table(table: &str) -> TableCreateStatement {
    Table::create()
        .table(Alias::new(table))
        .if_not_exists()
        .col(
            ColumnDef::new(Alias::new("version"))
                .string_len(255)
                .not_null()
                .primary_key(),
        )
        .col(
            ColumnDef::new(Alias::new("timestamp"))
                .timestamp()
                .not_null(),
        )
        .col(
            ColumnDef::new(Alias::new("status"))
                .string_len(16)
                .not_null(),
        )
        .to_owned()
}

/// Rendered DDL for [`create_state_table`]
#[must_use]
pub fn create_state_table_sql(table: &str) -> String {
    create_state_table(table).build(PostgresQueryBuilder)
}

pub(crate) fn select_one_sql(table: &str) -> String {
    format!(r#"SELECT version, "timestamp", status FROM "{table}" WHERE version = $1"#)
}

pub(crate) fn select_all_sql(table: &str) -> String {
    format!(r#"SELECT version, "timestamp", status FROM "{table}" ORDER BY version ASC"#)
}

pub(crate) fn upsert_sql(table: &str) -> String {
    format!(
        r#"INSERT INTO "{table}" (version, "timestamp", status) VALUES ($1, $2, $3)
           ON CONFLICT (version) DO UPDATE SET "timestamp" = EXCLUDED."timestamp", status = EXCLUDED.status"#
    )
}

pub(crate) fn update_status_sql(table: &str) -> String {
    format!(r#"UPDATE "{table}" SET status = $2, "timestamp" = $3 WHERE version = $1"#)
}

pub(crate) fn delete_sql(table: &str) -> String {
    format!(r#"DELETE FROM "{table}" WHERE version = $1"#)
}
