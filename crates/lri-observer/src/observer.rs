//! The read path.
//!
//! `Observer` answers audit queries from committed ledger state and the
//! metrics cache. It never writes to either: metrics that disagree with the
//! ledger are replayed into a temporary snapshot, not stored.
//!
//! Unknown subjects are not an error. They resolve to the genesis record and
//! produce an empty view.

use std::sync::Arc;

use tracing::debug;

use lri_contracts::{
    audit::{AuditSnapshot, AuthorityClaims, ContinuityReport, DriftReport},
    error::LriResult,
    identity::{IdentityRecord, SubjectId},
    metrics::MetricsSnapshot,
};
use lri_core::{
    drift,
    traits::{AuthorityPolicy, Clock, ContinuityLedger, SystemClock},
    CycleEngine, MetricsStore,
};

use crate::claims;

/// Read-only audit views for LRI agents.
pub struct Observer {
    ledger: Arc<dyn ContinuityLedger>,
    metrics: Arc<MetricsStore>,
    gate: Arc<dyn AuthorityPolicy>,
    clock: Box<dyn Clock>,
}

impl Observer {
    pub fn new(
        ledger: Arc<dyn ContinuityLedger>,
        metrics: Arc<MetricsStore>,
        gate: Arc<dyn AuthorityPolicy>,
    ) -> Self {
        Self {
            ledger,
            metrics,
            gate,
            clock: Box::new(SystemClock),
        }
    }

    /// An observer sharing `engine`'s ledger, metrics cache, and gate.
    pub fn for_engine(engine: &CycleEngine) -> Self {
        Self::new(engine.ledger(), engine.metrics(), engine.gate())
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Identity, drift, and claims for `subject_id` as of now.
    pub fn snapshot(&self, subject_id: &SubjectId) -> LriResult<AuditSnapshot> {
        let (record, metrics) = self.committed(subject_id)?;
        let drift_score = drift::calculate(&metrics.intentions);
        let verified = self.ledger.verify(&record).status.is_verified();

        Ok(AuditSnapshot {
            subject_id: subject_id.clone(),
            timestamp: self.clock.now(),
            continuity_hash: record.head_hash.clone(),
            drift_score,
            authority_claims: claims::derive(drift_score, verified),
            trajectory_length: record.len(),
        })
    }

    /// Head hash, chain length, and verification status.
    ///
    /// A broken chain is reported in the returned status, not as `Err`.
    pub fn continuity(&self, subject_id: &SubjectId) -> LriResult<ContinuityReport> {
        let record = self.ledger.load(subject_id)?;
        Ok(self.ledger.verify(&record))
    }

    /// Current drift and the sample sizes behind it.
    pub fn drift(&self, subject_id: &SubjectId) -> LriResult<DriftReport> {
        let (_, metrics) = self.committed(subject_id)?;
        Ok(DriftReport {
            subject_id: subject_id.clone(),
            drift_score: drift::calculate(&metrics.intentions),
            intentions_count: metrics.intentions.len(),
            actions_count: metrics.actions_count,
        })
    }

    /// Claims held under the active policy, with its drift threshold.
    pub fn authority_claims(&self, subject_id: &SubjectId) -> LriResult<AuthorityClaims> {
        let (record, metrics) = self.committed(subject_id)?;
        let drift_score = drift::calculate(&metrics.intentions);
        let verified = self.ledger.verify(&record).status.is_verified();

        Ok(AuthorityClaims {
            subject_id: subject_id.clone(),
            claims: claims::derive(drift_score, verified),
            policy_threshold: self.gate.drift_threshold(),
        })
    }

    fn committed(&self, subject_id: &SubjectId) -> LriResult<(IdentityRecord, MetricsSnapshot)> {
        let record = self.ledger.load(subject_id)?;
        let metrics = self.metrics.view(&record)?;
        debug!(
            subject_id = %subject_id,
            trajectory_length = record.len(),
            "observer read"
        );
        Ok((record, metrics))
    }
}
