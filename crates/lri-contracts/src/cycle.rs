//! Cycle request, phase, and result types.
//!
//! `ActionRequest` is the inbound shape handed to `CycleEngine::run_cycle()`.
//! `CycleSnapshot` is what a committed cycle returns to the caller and what
//! gets forwarded to the transmitter.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    authority::Context,
    identity::{SubjectId, Transition},
    metrics::AgentMetrics,
};

/// Intention recorded when a request does not declare one.
pub const UNKNOWN_INTENTION: &str = "unknown";

/// An inbound request to authorize and commit one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub subject_id: SubjectId,
    pub action: String,
    #[serde(default)]
    pub intention: Option<String>,
    #[serde(default)]
    pub context: Option<Context>,
}

impl ActionRequest {
    pub fn new(subject_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            subject_id: SubjectId::new(subject_id),
            action: action.into(),
            intention: None,
            context: None,
        }
    }

    pub fn with_intention(mut self, intention: impl Into<String>) -> Self {
        self.intention = Some(intention.into());
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    /// The declared intention, or `"unknown"` when absent.
    pub fn intention_or_unknown(&self) -> &str {
        self.intention.as_deref().unwrap_or(UNKNOWN_INTENTION)
    }
}

/// The state of a committed cycle, returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSnapshot {
    pub subject_id: SubjectId,
    pub trajectory: Vec<Transition>,
    pub head_hash: String,
    pub metrics: AgentMetrics,
}

/// Phases of one cycle, in the only order they may occur.
///
/// ```text
/// Loaded → DriftEvaluated → Authorized → Appended → Persisted → MetricsUpdated → SnapshotEmitted
///                         ↘ Rejected (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CyclePhase {
    Loaded,
    DriftEvaluated,
    Authorized,
    Rejected,
    Appended,
    Persisted,
    MetricsUpdated,
    SnapshotEmitted,
}

impl CyclePhase {
    /// Return true if `next` may directly follow `self`.
    pub fn can_advance_to(self, next: CyclePhase) -> bool {
        use CyclePhase::*;
        matches!(
            (self, next),
            (Loaded, DriftEvaluated)
                | (DriftEvaluated, Authorized)
                | (DriftEvaluated, Rejected)
                | (Authorized, Appended)
                | (Appended, Persisted)
                | (Persisted, MetricsUpdated)
                | (MetricsUpdated, SnapshotEmitted)
        )
    }

    /// `Rejected` and `SnapshotEmitted` end a cycle.
    pub fn is_terminal(self) -> bool {
        matches!(self, CyclePhase::Rejected | CyclePhase::SnapshotEmitted)
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Loaded => "LOADED",
            CyclePhase::DriftEvaluated => "DRIFT_EVALUATED",
            CyclePhase::Authorized => "AUTHORIZED",
            CyclePhase::Rejected => "REJECTED",
            CyclePhase::Appended => "APPENDED",
            CyclePhase::Persisted => "PERSISTED",
            CyclePhase::MetricsUpdated => "METRICS_UPDATED",
            CyclePhase::SnapshotEmitted => "SNAPSHOT_EMITTED",
        };
        f.write_str(name)
    }
}
