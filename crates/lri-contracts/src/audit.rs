//! Read models returned by the observer.
//!
//! None of these are persisted. They are computed from committed ledger and
//! metrics state on every request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::SubjectId;

/// Outcome of re-walking a hash chain.
///
/// A mismatch is a data-integrity finding reported alongside the rest of the
/// continuity report, not a request failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Every transition hash and the head hash recompute exactly.
    Verified,
    /// The transition at `position` does not hash to its stored value.
    Mismatch {
        position: usize,
        expected: String,
        found: String,
    },
    /// All transitions verify but `head_hash` does not point at the last one.
    HeadMismatch { expected: String, found: String },
}

impl VerificationStatus {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationStatus::Verified)
    }
}

/// Head hash, chain length, and verification status for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuityReport {
    pub subject_id: SubjectId,
    pub head_hash: String,
    pub chain_length: usize,
    #[serde(flatten)]
    pub status: VerificationStatus,
}

/// Full audit view of one agent's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSnapshot {
    pub subject_id: SubjectId,
    pub timestamp: DateTime<Utc>,
    pub continuity_hash: String,
    pub drift_score: f64,
    pub authority_claims: Vec<String>,
    pub trajectory_length: usize,
}

/// Current drift and the sample sizes it was computed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub subject_id: SubjectId,
    pub drift_score: f64,
    pub intentions_count: usize,
    pub actions_count: u64,
}

/// The authority standing of one agent under the active policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityClaims {
    pub subject_id: SubjectId,
    pub claims: Vec<String>,
    pub policy_threshold: f64,
}
