//! The continuity ledger: `ContinuityLedger` over any `RecordStore`.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use lri_contracts::{
    audit::ContinuityReport,
    error::{LriError, LriResult},
    identity::{IdentityRecord, SubjectId, Transition},
};
use lri_core::traits::ContinuityLedger;

use crate::{chain, store::RecordStore};

/// Hash-chained identity ledger backed by `S`.
///
/// The ledger is the only writer of identity records. `append()` is pure;
/// `commit()` stores a record only if its chain verifies and the stored
/// trajectory is an exact prefix of it, so a record built from a stale load
/// or an edited history never replaces the committed chain.
#[derive(Debug)]
pub struct Ledger<S> {
    store: S,
}

impl<S: RecordStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Every subject with a committed record.
    pub fn subjects(&self) -> LriResult<Vec<SubjectId>> {
        self.store.subjects()
    }
}

impl<S: RecordStore> ContinuityLedger for Ledger<S> {
    fn load(&self, subject_id: &SubjectId) -> LriResult<IdentityRecord> {
        Ok(self
            .store
            .get(subject_id)?
            .unwrap_or_else(|| IdentityRecord::genesis(subject_id.clone())))
    }

    fn create(&self, subject_id: &SubjectId) -> LriResult<IdentityRecord> {
        if let Some(existing) = self.store.get(subject_id)? {
            return Ok(existing);
        }
        let record = IdentityRecord::genesis(subject_id.clone());
        if let Err(e) = self.store.put_if_extends(&record) {
            // Lost a race with a commit: the committed record wins.
            return self.store.get(subject_id)?.ok_or(e);
        }
        info!(subject_id = %subject_id, "identity record created");
        Ok(record)
    }

    /// Hash `{prev_hash, action, intention, timestamp}` against the current
    /// head and return the extended record.
    fn append(
        &self,
        record: &IdentityRecord,
        action: &str,
        intention: &str,
        timestamp: DateTime<Utc>,
    ) -> IdentityRecord {
        let continuity_hash =
            chain::hash_transition(&record.head_hash, action, intention, &timestamp);

        let mut next = record.clone();
        next.trajectory.push(Transition {
            action: action.to_string(),
            intention: intention.to_string(),
            timestamp,
            continuity_hash: continuity_hash.clone(),
        });
        next.head_hash = continuity_hash;

        debug!(
            subject_id = %record.subject_id,
            prev_hash = %record.head_hash,
            head_hash = %next.head_hash,
            "transition appended"
        );
        next
    }

    /// Verify `record` end to end, then store it if it extends the
    /// committed chain by zero or more transitions.
    fn commit(&self, record: &IdentityRecord) -> LriResult<()> {
        chain::ensure_verified(&chain::verify_record(record)).map_err(|e| {
            LriError::PersistenceFailure {
                reason: format!("refusing to commit unverified record: {}", e),
            }
        })?;
        self.store.put_if_extends(record)
    }

    fn verify(&self, record: &IdentityRecord) -> ContinuityReport {
        chain::verify_record(record)
    }
}
