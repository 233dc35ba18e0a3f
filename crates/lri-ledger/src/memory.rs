//! In-memory implementation of `RecordStore`.
//!
//! `InMemoryRecordStore` keeps every record in a `HashMap` behind an
//! `RwLock`. A commit swaps the whole record under the write lock, so a
//! concurrent reader sees either the previous record or the new one.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use lri_contracts::{
    error::{LriError, LriResult},
    identity::{IdentityRecord, SubjectId},
};

use crate::store::{check_extends, RecordStore};

/// An in-memory, process-local record store.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    pub(crate) records: Arc<RwLock<HashMap<SubjectId, IdentityRecord>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored subjects.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, subject_id: &SubjectId) -> LriResult<Option<IdentityRecord>> {
        let records = self.records.read().map_err(|e| LriError::PersistenceFailure {
            reason: format!("record store lock poisoned: {}", e),
        })?;
        Ok(records.get(subject_id).cloned())
    }

    fn put_if_extends(&self, record: &IdentityRecord) -> LriResult<()> {
        let mut records = self.records.write().map_err(|e| LriError::PersistenceFailure {
            reason: format!("record store lock poisoned: {}", e),
        })?;

        check_extends(records.get(&record.subject_id), record)?;
        records.insert(record.subject_id.clone(), record.clone());
        Ok(())
    }

    fn subjects(&self) -> LriResult<Vec<SubjectId>> {
        let records = self.records.read().map_err(|e| LriError::PersistenceFailure {
            reason: format!("record store lock poisoned: {}", e),
        })?;
        let mut ids: Vec<SubjectId> = records.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
