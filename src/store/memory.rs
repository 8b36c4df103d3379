//! In-process schema store
//!
//! Useful for tests and for embedders that keep migration state elsewhere.
//! Failures can be injected per operation to exercise the dirty and
//! compounded-error paths.

use super::SchemaStore;
use crate::context::MigrationContext;
use crate::migration::{BoxError, SchemaRecord, SchemaStatus};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Store operation that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Ensure,
    Find,
    List,
    Upsert,
    /// Status writes to the given status
    SetStatus(SchemaStatus),
    Delete,
}

/// Errors raised by [`MemoryStore`]
#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    /// A failure injected with [`MemoryStore::inject_failure`]
    #[error("injected failure for {0:?}")]
    Injected(StoreOp),

    /// `set_status` on a version with no record
    #[error("no schema record for version {0}")]
    MissingRecord(String),
}

/// Mutex-guarded, version-ordered record map
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, SchemaRecord>>,
    failures: Mutex<Vec<StoreOp>>,
    ensure_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    /// An empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = SchemaRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Insert or replace a record directly
    pub fn insert(&self, record: SchemaRecord) {
        lock(&self.records).insert(record.version.clone(), record);
    }

    /// Current record for `version`
    #[must_use]
    pub fn get(&self, version: &str) -> Option<SchemaRecord> {
        lock(&self.records).get(version).cloned()
    }

    /// Snapshot of every record, ordered by version
    #[must_use]
    pub fn records(&self) -> Vec<SchemaRecord> {
        lock(&self.records).values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.records).is_empty()
    }

    /// Make every subsequent `op` fail until [`clear_failures`](Self::clear_failures)
    pub fn inject_failure(&self, op: StoreOp) {
        lock(&self.failures).push(op);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// How many times `ensure` was called
    #[must_use]
    pub fn ensure_calls(&self) -> usize {
        self.ensure_calls.load(Ordering::SeqCst)
    }

    fn guard(&self, ctx: &MigrationContext, op: StoreOp) -> Result<(), BoxError> {
        ctx.check()?;
        if lock(&self.failures).contains(&op) {
            return Err(Box::new(MemoryStoreError::Injected(op)));
        }
        Ok(())
    }
}

impl SchemaStore for MemoryStore {
    fn ensure(&self, ctx: &MigrationContext) -> Result<(), BoxError> {
        self.guard(ctx, StoreOp::Ensure)?;
        self.ensure_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn find(&self, ctx: &MigrationContext, version: &str) -> Result<Option<SchemaRecord>, BoxError> {
        self.guard(ctx, StoreOp::Find)?;
        Ok(self.get(version))
    }

    fn list(&self, ctx: &MigrationContext) -> Result<Vec<SchemaRecord>, BoxError> {
        self.guard(ctx, StoreOp::List)?;
        Ok(self.records())
    }

    fn upsert(&self, ctx: &MigrationContext, record: &SchemaRecord) -> Result<(), BoxError> {
        self.guard(ctx, StoreOp::Upsert)?;
        self.insert(record.clone());
        Ok(())
    }

    fn set_status(
        &self,
        ctx: &MigrationContext,
        version: &str,
        status: SchemaStatus,
        at: DateTime<Utc>,
    ) -> Result<(), BoxError> {
        self.guard(ctx, StoreOp::SetStatus(status))?;
        let mut records = lock(&self.records);
        let record = records
            .get_mut(version)
            .ok_or_else(|| MemoryStoreError::MissingRecord(version.to_string()))?;
        record.status = status;
        record.timestamp = at;
        Ok(())
    }

    fn delete(&self, ctx: &MigrationContext, version: &str) -> Result<(), BoxError> {
        self.guard(ctx, StoreOp::Delete)?;
        lock(&self.records).remove(version);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_are_ordered_by_version() {
        let store = MemoryStore::with_records([
            SchemaRecord::in_progress("3"),
            SchemaRecord::in_progress("1"),
            SchemaRecord::in_progress("2"),
        ]);
        let versions: Vec<_> = store.records().into_iter().map(|r| r.version).collect();
        assert_eq!(versions, ["1", "2", "3"]);
    }

    #[test]
    fn test_set_status_requires_record() {
        let store = MemoryStore::new();
        let ctx = MigrationContext::new();
        let err = store.set_status(&ctx, "1", SchemaStatus::Applied, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "no schema record for version 1");
    }

    #[test]
    fn test_set_status_updates_timestamp() {
        let store = MemoryStore::new();
        let ctx = MigrationContext::new();
        let created = SchemaRecord::in_progress("1");
        store.upsert(&ctx, &created).unwrap();
        let later = created.timestamp + chrono::Duration::seconds(5);
        store.set_status(&ctx, "1", SchemaStatus::Applied, later).unwrap();
        let record = store.get("1").unwrap();
        assert_eq!(record.status, SchemaStatus::Applied);
        assert_eq!(record.timestamp, later);
    }

    #[test]
    fn test_injected_failures_are_per_operation() {
        let store = MemoryStore::new();
        let ctx = MigrationContext::new();
        store.inject_failure(StoreOp::SetStatus(SchemaStatus::Dirty));
        store.upsert(&ctx, &SchemaRecord::in_progress("1")).unwrap();
        assert!(store.set_status(&ctx, "1", SchemaStatus::Applied, Utc::now()).is_ok());
        assert!(store.set_status(&ctx, "1", SchemaStatus::Dirty, Utc::now()).is_err());

        store.clear_failures();
        assert!(store.set_status(&ctx, "1", SchemaStatus::Dirty, Utc::now()).is_ok());
    }

    #[test]
    fn test_cancelled_context_rejected() {
        let store = MemoryStore::new();
        let ctx = MigrationContext::new();
        ctx.cancel();
        assert!(store.find(&ctx, "1").is_err());
        assert!(store.upsert(&ctx, &SchemaRecord::in_progress("1")).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_absent_is_ok() {
        let store = MemoryStore::new();
        assert!(store.delete(&MigrationContext::new(), "missing").is_ok());
    }
}
