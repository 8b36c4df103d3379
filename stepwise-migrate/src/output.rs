//! Terminal rendering for migration status and schema records

use colored::{ColoredString, Colorize};
use serde::Serialize;
use std::fmt::Write;
use stepwise::migration::{MigrationStatus, SchemaRecord, SchemaStatus};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Coloured label for a recorded status (`pending` when there is no record)
pub fn status_label(status: Option<SchemaStatus>) -> ColoredString {
    match status {
        Some(SchemaStatus::Applied) => "applied".green(),
        Some(SchemaStatus::Dirty) => "dirty".red().bold(),
        Some(SchemaStatus::InProgress) => "in_progress".yellow(),
        None => "pending".dimmed(),
    }
}

/// Per-migration table plus a summary line
pub fn render_status(status: &MigrationStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n📊 Migration Status\n");

    if status.migrations.is_empty() {
        let _ = writeln!(out, "  No migrations registered");
    }
    for state in &status.migrations {
        let at = state
            .record
            .as_ref()
            .map(|r| r.timestamp.format(TIME_FORMAT).to_string())
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {:<24} {:<12} {}",
            state.version,
            status_label(state.status()),
            at
        );
    }

    let _ = writeln!(
        out,
        "\n📈 Summary: {} applied, {} dirty, {} pending ({} total)",
        status.applied_count, status.dirty_count, status.pending_count, status.total
    );

    let dirty = status.dirty_versions();
    if !dirty.is_empty() {
        let _ = writeln!(
            out,
            "{} dirty migrations need manual attention: {}",
            "⚠️".yellow(),
            dirty.join(", ")
        );
    }
    out
}

/// Raw schema store contents
pub fn render_records(records: &[SchemaRecord]) -> String {
    if records.is_empty() {
        return "No schema records\n".to_string();
    }
    let mut out = String::new();
    for record in records {
        let _ = writeln!(
            out,
            "  {:<24} {:<12} {}",
            record.version,
            status_label(Some(record.status)),
            record.timestamp.format(TIME_FORMAT)
        );
    }
    out
}

/// Pretty JSON for `--json` output
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
