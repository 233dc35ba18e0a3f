//! Per-agent metrics cache.
//!
//! `MetricsStore` keeps one `MetricsSnapshot` per agent. It is a cache over
//! the ledger, never a second source of truth: whenever a cached entry
//! disagrees with a record's trajectory length, the entry is rebuilt by
//! replaying that trajectory.

use std::{collections::HashMap, sync::RwLock};

use lri_contracts::{
    error::{LriError, LriResult},
    identity::{IdentityRecord, SubjectId},
    metrics::MetricsSnapshot,
};

#[derive(Debug, Default)]
pub struct MetricsStore {
    entries: RwLock<HashMap<SubjectId, MetricsSnapshot>>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached snapshot for `subject_id`, or an empty one.
    pub fn snapshot(&self, subject_id: &SubjectId) -> LriResult<MetricsSnapshot> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(subject_id).cloned().unwrap_or_default())
    }

    /// Metrics consistent with `record`.
    ///
    /// Uses the cache when it covers exactly `record.trajectory`, otherwise
    /// replays the trajectory without touching the cache.
    pub fn view(&self, record: &IdentityRecord) -> LriResult<MetricsSnapshot> {
        let cached = self.snapshot(&record.subject_id)?;
        if cached.actions_count == record.len() as u64 {
            Ok(cached)
        } else {
            Ok(MetricsSnapshot::from_record(record))
        }
    }

    /// Fold the newest transition of a freshly committed `record` into the
    /// cache and return the updated snapshot.
    ///
    /// If the cached entry is not exactly one action behind, it is rebuilt
    /// from the whole trajectory instead.
    pub fn record_commit(&self, record: &IdentityRecord) -> LriResult<MetricsSnapshot> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let entry = entries.entry(record.subject_id.clone()).or_default();

        match record.last() {
            Some(last) if entry.actions_count + 1 == record.len() as u64 => {
                entry.record(&last.intention);
            }
            _ => *entry = MetricsSnapshot::from_record(record),
        }

        Ok(entry.clone())
    }

    /// Drop every cached entry. The next read replays from the ledger.
    pub fn clear(&self) -> LriResult<()> {
        self.entries.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> LriError {
    LriError::CycleAborted {
        reason: format!("metrics store lock poisoned: {}", e),
    }
}
