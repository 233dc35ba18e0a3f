//! Collaborator traits wired together by the cycle engine.
//!
//! - `ContinuityLedger`: trusted owner of every identity record
//! - `AuthorityPolicy`: trusted gate, consulted before any mutation
//! - `Transmitter`: outbound snapshot transport (fire-and-forget)
//! - `DecisionRecorder`: outbound decision log (fire-and-forget)
//! - `Clock`: source of transition timestamps
//!
//! The engine only mutates state through `ContinuityLedger::commit()` and the
//! metrics cache, and only after `AuthorityPolicy::authorize()` returns
//! `Verdict::Authorized`.

use chrono::{DateTime, Utc};

use lri_contracts::{
    audit::ContinuityReport,
    authority::{Context, Verdict},
    cycle::CycleSnapshot,
    error::LriResult,
    identity::{IdentityRecord, SubjectId},
    outbound::DecisionRecord,
};

/// Per-agent, append-only, hash-chained identity storage.
pub trait ContinuityLedger: Send + Sync {
    /// Return the committed record for `subject_id`, or a genesis record if
    /// none exists.
    ///
    /// This is the single get-or-create path. Absence is never an error; only
    /// a failing durable store returns `Err`.
    fn load(&self, subject_id: &SubjectId) -> LriResult<IdentityRecord>;

    /// Explicitly provision `subject_id`, persisting an empty record if none
    /// exists yet. Idempotent.
    fn create(&self, subject_id: &SubjectId) -> LriResult<IdentityRecord>;

    /// Return `record` with one new transition appended and `head_hash`
    /// advanced.
    ///
    /// Pure: nothing is stored until `commit()` is called with the result.
    fn append(
        &self,
        record: &IdentityRecord,
        action: &str,
        intention: &str,
        timestamp: DateTime<Utc>,
    ) -> IdentityRecord;

    /// Durably persist `record`, replacing the previous version atomically.
    ///
    /// Returns `LriError::PersistenceFailure` if the store refuses the write;
    /// in that case the previously committed record stays visible.
    fn commit(&self, record: &IdentityRecord) -> LriResult<()>;

    /// Recompute every hash in `record` and report whether the chain holds.
    fn verify(&self, record: &IdentityRecord) -> ContinuityReport;
}

/// The authority gate: decides whether an action may proceed.
///
/// Implementations must be free of side effects. The verdict is advisory;
/// only the cycle engine acts on it.
pub trait AuthorityPolicy: Send + Sync {
    /// Evaluate `action` for the agent described by `record`.
    ///
    /// `drift_score` is computed over the intentions committed *before* this
    /// action.
    fn authorize(
        &self,
        record: &IdentityRecord,
        action: &str,
        context: &Context,
        drift_score: f64,
    ) -> LriResult<Verdict>;

    /// The drift threshold above which critical actions are refused.
    fn drift_threshold(&self) -> f64;
}

/// One-way transport for committed cycle snapshots.
pub trait Transmitter: Send + Sync {
    /// Hand `snapshot` to the transport. Failure never rolls back the cycle.
    fn transmit(&self, snapshot: &CycleSnapshot) -> LriResult<()>;
}

/// Append-only sink for committed decisions.
pub trait DecisionRecorder: Send + Sync {
    /// Append one decision. Failure never rolls back the cycle.
    fn record(&self, entry: &DecisionRecord) -> LriResult<()>;
}

/// Wall-clock source for transition timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// `Clock` backed by `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
