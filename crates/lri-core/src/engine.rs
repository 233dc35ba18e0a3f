//! The LRI cycle engine: the authorize-then-commit state machine.
//!
//! The engine enforces the cycle ordering for every incoming action:
//!
//!   Load → Drift → Authority → [Ledger append] → Commit → Metrics → Snapshot
//!
//! The invariant is absolute: `ContinuityLedger::commit()` is NEVER called
//! unless `AuthorityPolicy::authorize()` returned `Verdict::Authorized`, and
//! the metrics cache is never updated before the commit succeeded. A cycle
//! for one subject holds that subject's lock from load to snapshot, so two
//! cycles for the same agent cannot fork its chain. Cycles for different
//! agents run in parallel.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use lri_contracts::{
    authority::{AuthorityDecision, Verdict},
    cycle::{ActionRequest, CyclePhase, CycleSnapshot},
    error::{LriError, LriResult},
    identity::{IdentityRecord, SubjectId},
    metrics::AgentMetrics,
    outbound::DecisionRecord,
};

use crate::{
    drift,
    metrics::MetricsStore,
    traits::{AuthorityPolicy, Clock, ContinuityLedger, DecisionRecorder, SystemClock, Transmitter},
};

// ── Per-subject locking ───────────────────────────────────────────────────────

/// One mutex per subject with a cycle in flight.
///
/// The outer map lock is held only long enough to fetch, insert, or prune a
/// handle; the work itself runs under the per-subject lock. An entry is
/// removed once no caller holds or waits on it, so the table stays bounded
/// by the number of concurrently active subjects.
#[derive(Default)]
struct SubjectLocks {
    inner: Mutex<HashMap<SubjectId, Arc<Mutex<()>>>>,
}

impl SubjectLocks {
    /// Run `f` while holding `subject_id`'s lock.
    fn with_lock<T>(
        &self,
        subject_id: &SubjectId,
        f: impl FnOnce() -> LriResult<T>,
    ) -> LriResult<T> {
        let handle = {
            let mut map = self.inner.lock().map_err(|e| LriError::CycleAborted {
                reason: format!("subject lock table poisoned: {}", e),
            })?;
            Arc::clone(map.entry(subject_id.clone()).or_default())
        };

        let result = {
            let _guard = handle.lock().map_err(|e| LriError::CycleAborted {
                reason: format!("subject '{}' lock poisoned: {}", subject_id, e),
            })?;
            f()
        };

        self.prune(subject_id, &handle);
        result
    }

    /// Drop the entry if only the table and `handle` still reference it.
    fn prune(&self, subject_id: &SubjectId, handle: &Arc<Mutex<()>>) {
        let Ok(mut map) = self.inner.lock() else {
            return;
        };
        let idle = map
            .get(subject_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, handle) && Arc::strong_count(handle) == 2);
        if idle {
            map.remove(subject_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }
}

// ── Phase tracking ────────────────────────────────────────────────────────────

/// Tracks the current phase of one cycle and rejects illegal jumps.
struct PhaseTracker<'a> {
    subject_id: &'a SubjectId,
    current: CyclePhase,
}

impl<'a> PhaseTracker<'a> {
    fn start(subject_id: &'a SubjectId) -> Self {
        debug!(subject_id = %subject_id, phase = %CyclePhase::Loaded, "cycle phase");
        Self { subject_id, current: CyclePhase::Loaded }
    }

    fn advance(&mut self, next: CyclePhase) -> LriResult<()> {
        if !self.current.can_advance_to(next) {
            return Err(LriError::CycleAborted {
                reason: format!("illegal cycle transition {} -> {}", self.current, next),
            });
        }
        debug!(subject_id = %self.subject_id, phase = %next, "cycle phase");
        self.current = next;
        Ok(())
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// The only component permitted to change an agent's committed state.
///
/// Construct one engine per process and share it; `run_cycle()` takes
/// `&self` and is safe to call from many threads at once.
pub struct CycleEngine {
    ledger: Arc<dyn ContinuityLedger>,
    gate: Arc<dyn AuthorityPolicy>,
    metrics: Arc<MetricsStore>,
    transmitter: Option<Box<dyn Transmitter>>,
    recorder: Option<Box<dyn DecisionRecorder>>,
    clock: Box<dyn Clock>,
    locks: SubjectLocks,
}

impl CycleEngine {
    /// Create an engine over the given ledger, gate, and metrics cache.
    ///
    /// No outbound collaborators are attached and the system clock is used;
    /// see the `with_*` methods to change either.
    pub fn new(
        ledger: Arc<dyn ContinuityLedger>,
        gate: Arc<dyn AuthorityPolicy>,
        metrics: Arc<MetricsStore>,
    ) -> Self {
        Self {
            ledger,
            gate,
            metrics,
            transmitter: None,
            recorder: None,
            clock: Box::new(SystemClock),
            locks: SubjectLocks::default(),
        }
    }

    pub fn with_transmitter(mut self, transmitter: Box<dyn Transmitter>) -> Self {
        self.transmitter = Some(transmitter);
        self
    }

    pub fn with_recorder(mut self, recorder: Box<dyn DecisionRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ledger(&self) -> Arc<dyn ContinuityLedger> {
        Arc::clone(&self.ledger)
    }

    pub fn gate(&self) -> Arc<dyn AuthorityPolicy> {
        Arc::clone(&self.gate)
    }

    pub fn metrics(&self) -> Arc<MetricsStore> {
        Arc::clone(&self.metrics)
    }

    /// Explicitly provision `subject_id` under its cycle lock.
    pub fn provision(&self, subject_id: &SubjectId) -> LriResult<IdentityRecord> {
        self.locks.with_lock(subject_id, || {
            info!(subject_id = %subject_id, "provisioning identity");
            self.ledger.create(subject_id)
        })
    }

    /// Run one authorize-then-commit cycle for `request`.
    ///
    /// # Pipeline
    ///
    /// 1. Load the identity record (genesis if unseen)
    /// 2. Compute drift over the intentions committed so far
    /// 3. Ask the gate; on `Denied` return `AuthorizationDenied` with nothing written
    /// 4. Append the transition and commit it to the ledger
    /// 5. Fold the committed transition into the metrics cache
    /// 6. Recompute drift over the updated intentions
    /// 7. Build the snapshot and hand it to the transmitter and decision recorder
    ///
    /// # Errors
    ///
    /// `AuthorizationDenied` is the expected outcome of a refused action.
    /// `PersistenceFailure` means the commit did not happen and the previous
    /// record is still the visible one. Outbound delivery failures are logged
    /// and never surface here.
    pub fn run_cycle(&self, request: &ActionRequest) -> LriResult<CycleSnapshot> {
        self.locks.with_lock(&request.subject_id, || self.run_locked(request))
    }

    /// Steps 1 to 7 of `run_cycle`; the caller holds the subject lock.
    fn run_locked(&self, request: &ActionRequest) -> LriResult<CycleSnapshot> {
        let subject_id = &request.subject_id;
        let intention = request.intention_or_unknown();
        let context = request.context.clone().unwrap_or_default();

        // ── Step 1: Load ─────────────────────────────────────────────────────
        let record = self.ledger.load(subject_id)?;
        let mut phase = PhaseTracker::start(subject_id);

        // ── Step 2: Pre-action drift ─────────────────────────────────────────
        let before = self.metrics.view(&record)?;
        let drift_before = drift::calculate(&before.intentions);
        phase.advance(CyclePhase::DriftEvaluated)?;

        // ── Step 3: Authority ────────────────────────────────────────────────
        //
        // Nothing below this block runs unless the gate authorized the action.
        let verdict = self.gate.authorize(&record, &request.action, &context, drift_before)?;
        let decision = AuthorityDecision {
            action: request.action.clone(),
            context,
            drift_score: drift_before,
            verdict,
        };

        if let Verdict::Denied { rule_id, reason } = &decision.verdict {
            phase.advance(CyclePhase::Rejected)?;
            warn!(
                subject_id = %subject_id,
                action = %decision.action,
                drift = decision.drift_score,
                rule_id = %rule_id,
                reason = %reason,
                "authority denied action"
            );
            return Err(LriError::AuthorizationDenied {
                subject_id: subject_id.to_string(),
                action: decision.action.clone(),
                reason: reason.clone(),
            });
        }
        phase.advance(CyclePhase::Authorized)?;

        // ── Step 4: Append and commit ────────────────────────────────────────
        let timestamp = self.next_timestamp(&record);
        let appended = self.ledger.append(&record, &decision.action, intention, timestamp);
        phase.advance(CyclePhase::Appended)?;

        if let Err(e) = self.ledger.commit(&appended) {
            warn!(
                subject_id = %subject_id,
                action = %decision.action,
                error = %e,
                "commit failed, transition discarded"
            );
            return Err(e);
        }
        phase.advance(CyclePhase::Persisted)?;

        // ── Step 5: Metrics ──────────────────────────────────────────────────
        let metrics = self.metrics.record_commit(&appended)?;
        phase.advance(CyclePhase::MetricsUpdated)?;

        // ── Step 6: Post-action drift ────────────────────────────────────────
        let drift_after = drift::calculate(&metrics.intentions);

        // ── Step 7: Snapshot and outbound delivery ───────────────────────────
        let snapshot = CycleSnapshot {
            subject_id: subject_id.clone(),
            trajectory: appended.trajectory.clone(),
            head_hash: appended.head_hash.clone(),
            metrics: AgentMetrics {
                actions: metrics.actions_count,
                drift: drift_after,
            },
        };

        let entry = DecisionRecord::new(
            subject_id.clone(),
            intention,
            decision.action.clone(),
            decision.context.clone(),
            timestamp,
        );
        self.deliver(&snapshot, &entry);
        phase.advance(CyclePhase::SnapshotEmitted)?;

        info!(
            subject_id = %subject_id,
            action = %decision.action,
            chain_length = snapshot.trajectory.len(),
            head_hash = %snapshot.head_hash,
            drift = drift_after,
            "cycle committed"
        );

        Ok(snapshot)
    }

    /// Current time, clamped so it never precedes the last transition.
    fn next_timestamp(&self, record: &IdentityRecord) -> DateTime<Utc> {
        let now = self.clock.now();
        match record.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        }
    }

    /// Forward a committed cycle to the outbound collaborators.
    ///
    /// Failures are logged only: the ledger write has already happened.
    fn deliver(&self, snapshot: &CycleSnapshot, entry: &DecisionRecord) {
        if let Some(transmitter) = &self.transmitter {
            if let Err(e) = transmitter.transmit(snapshot) {
                warn!(subject_id = %snapshot.subject_id, error = %e, "snapshot transmission failed");
            }
        }
        if let Some(recorder) = &self.recorder {
            if let Err(e) = recorder.record(entry) {
                warn!(subject_id = %entry.agent_id, error = %e, "decision record failed");
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
