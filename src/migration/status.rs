//! Migration status tracking

use super::{SchemaRecord, SchemaStatus};
use serde::Serialize;

/// Recorded state of one registered migration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationState {
    /// Migration version
    pub version: String,

    /// Record in the schema store (`None` if never attempted)
    pub record: Option<SchemaRecord>,
}

impl MigrationState {
    /// Create a new `MigrationState`
    #[must_use]
    pub fn new(version: impl Into<String>, record: Option<SchemaRecord>) -> Self {
        Self {
            version: version.into(),
            record,
        }
    }

    /// Recorded status, `None` when the version was never attempted
    #[must_use]
    pub fn status(&self) -> Option<SchemaStatus> {
        self.record.as_ref().map(|r| r.status)
    }

    /// Whether `up` would apply this migration
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.status().is_some_and(SchemaStatus::is_attempted)
    }
}

/// Migration status information
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    /// Every registered migration, in traversal order
    pub migrations: Vec<MigrationState>,

    /// Total number of registered migrations
    pub total: usize,

    /// Number of `applied` migrations
    pub applied_count: usize,

    /// Number of `dirty` migrations
    pub dirty_count: usize,

    /// Number of migrations `up` would still apply (absent or `in_progress`)
    pub pending_count: usize,
}

impl MigrationStatus {
    /// Create a new `MigrationStatus`
    #[must_use]
    pub fn new(migrations: Vec<MigrationState>) -> Self {
        let count = |status| migrations.iter().filter(|m| m.status() == Some(status)).count();
        let applied_count = count(SchemaStatus::Applied);
        let dirty_count = count(SchemaStatus::Dirty);
        let pending_count = migrations.iter().filter(|m| m.is_pending()).count();

        Self {
            total: migrations.len(),
            migrations,
            applied_count,
            dirty_count,
            pending_count,
        }
    }

    /// Check if all migrations are applied
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.applied_count == self.total
    }

    /// Versions whose record is `dirty`
    #[must_use]
    pub fn dirty_versions(&self) -> Vec<&str> {
        self.migrations
            .iter()
            .filter(|m| m.status() == Some(SchemaStatus::Dirty))
            .map(|m| m.version.as_str())
            .collect()
    }

    /// Last applied migration in traversal order
    #[must_use]
    pub fn latest_applied_version(&self) -> Option<&str> {
        self.migrations
            .iter()
            .rev()
            .find(|m| m.status() == Some(SchemaStatus::Applied))
            .map(|m| m.version.as_str())
    }

    /// First migration `up` would apply
    #[must_use]
    pub fn next_pending_version(&self) -> Option<&str> {
        self.migrations
            .iter()
            .find(|m| m.is_pending())
            .map(|m| m.version.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn state(version: &str, status: Option<SchemaStatus>) -> MigrationState {
        MigrationState::new(version, status.map(|s| SchemaRecord::new(version, s, Utc::now())))
    }

    #[test]
    fn test_counts() {
        let status = MigrationStatus::new(vec![
            state("1", Some(SchemaStatus::Applied)),
            state("2", Some(SchemaStatus::Dirty)),
            state("3", Some(SchemaStatus::InProgress)),
            state("4", None),
        ]);
        assert_eq!(status.total, 4);
        assert_eq!(status.applied_count, 1);
        assert_eq!(status.dirty_count, 1);
        assert_eq!(status.pending_count, 2);
        assert!(!status.is_up_to_date());
        assert_eq!(status.dirty_versions(), ["2"]);
        assert_eq!(status.latest_applied_version(), Some("1"));
        assert_eq!(status.next_pending_version(), Some("3"));
    }

    #[test]
    fn test_empty_is_up_to_date() {
        let status = MigrationStatus::new(Vec::new());
        assert!(status.is_up_to_date());
        assert_eq!(status.latest_applied_version(), None);
        assert_eq!(status.next_pending_version(), None);
    }
}
