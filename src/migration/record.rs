//! `SchemaRecord` - one persisted status row per attempted migration version

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a migration version in the schema store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaStatus {
    /// The forward operation is running (or the runner died while it ran)
    InProgress,
    /// An operation failed; needs manual intervention
    Dirty,
    /// The forward operation completed
    Applied,
}

impl SchemaStatus {
    /// Persisted string form
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaStatus::InProgress => "in_progress",
            SchemaStatus::Dirty => "dirty",
            SchemaStatus::Applied => "applied",
        }
    }

    /// `applied` or `dirty`: the migration has run to completion or failure
    ///
    /// `up` skips attempted versions and `down` only reverts attempted
    /// versions, so both directions share this single predicate.
    #[must_use]
    pub fn is_attempted(self) -> bool {
        matches!(self, SchemaStatus::Applied | SchemaStatus::Dirty)
    }
}

impl fmt::Display for SchemaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unknown status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown schema status '{0}', expected one of: in_progress, dirty, applied")]
pub struct ParseStatusError(pub String);

impl FromStr for SchemaStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(SchemaStatus::InProgress),
            "dirty" => Ok(SchemaStatus::Dirty),
            "applied" => Ok(SchemaStatus::Applied),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Represents a row in the schema store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRecord {
    /// Migration version this record tracks
    pub version: String,

    /// When the record was created or last transitioned
    pub timestamp: DateTime<Utc>,

    /// Current lifecycle status
    pub status: SchemaStatus,
}

impl SchemaRecord {
    /// Create a new `SchemaRecord`
    #[must_use]
    pub fn new(version: impl Into<String>, status: SchemaStatus, timestamp: DateTime<Utc>) -> Self {
        Self {
            version: version.into(),
            timestamp,
            status,
        }
    }

    /// A fresh `in_progress` record stamped with the current time
    #[must_use]
    pub fn in_progress(version: impl Into<String>) -> Self {
        Self::new(version, SchemaStatus::InProgress, Utc::now())
    }

    /// See [`SchemaStatus::is_attempted`]
    #[must_use]
    pub fn is_attempted(&self) -> bool {
        self.status.is_attempted()
    }
}

/// Whether an optional record counts as attempted; absence never does
#[must_use]
pub fn is_attempted(record: Option<&SchemaRecord>) -> bool {
    record.is_some_and(SchemaRecord::is_attempted)
}
