//! The storage contract behind the ledger.
//!
//! A store persists whole `IdentityRecord`s keyed by subject. It knows
//! nothing about hashing; the ledger hands it records that are already
//! chained and verified.

use lri_contracts::{
    error::{LriError, LriResult},
    identity::{IdentityRecord, SubjectId},
};

/// Durable, per-subject record storage.
pub trait RecordStore: Send + Sync {
    /// The stored record for `subject_id`, if any.
    fn get(&self, subject_id: &SubjectId) -> LriResult<Option<IdentityRecord>>;

    /// Replace the stored record only if `record` extends it, as decided by
    /// `check_extends` under the store's write lock.
    ///
    /// Returns `LriError::PersistenceFailure` if the store is unavailable or
    /// `record` would drop or rewrite committed history. Readers see either
    /// the old or the new record, never a partial one.
    fn put_if_extends(&self, record: &IdentityRecord) -> LriResult<()>;

    /// Every subject with a stored record.
    fn subjects(&self) -> LriResult<Vec<SubjectId>>;
}

/// Accept `record` only if the stored trajectory is an exact prefix of it.
///
/// An absent record is the empty prefix. Any number of transitions may be
/// appended between commits; a record built from a stale load, or one whose
/// committed transitions were edited, is refused.
pub fn check_extends(stored: Option<&IdentityRecord>, record: &IdentityRecord) -> LriResult<()> {
    let Some(stored) = stored else {
        return Ok(());
    };

    let committed = stored.trajectory.len();
    if record.trajectory.len() < committed {
        return Err(LriError::PersistenceFailure {
            reason: format!(
                "stale write for subject '{}': stored chain has {} transitions, record has {}",
                record.subject_id,
                committed,
                record.trajectory.len()
            ),
        });
    }

    if let Some(position) = stored
        .trajectory
        .iter()
        .zip(&record.trajectory)
        .position(|(old, new)| old != new)
    {
        return Err(LriError::PersistenceFailure {
            reason: format!(
                "stale write for subject '{}': record diverges from committed history at position {}",
                record.subject_id, position
            ),
        });
    }

    Ok(())
}
