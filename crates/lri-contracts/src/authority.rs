//! Authority verdicts and decisions.
//!
//! The gate returns a `Verdict`; the cycle engine is the only component that
//! acts on it. Denial is an ordinary outcome, not an error, until the engine
//! turns it into `LriError::AuthorizationDenied` for the caller.

use serde::{Deserialize, Serialize};

/// Request context passed through to policy rules and the decision log.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// The tagged result of evaluating the authority rule chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// The action may proceed to the ledger.
    Authorized,
    /// The action is refused. Nothing is written.
    Denied {
        /// Identifier of the rule that produced the denial.
        rule_id: String,
        /// Human-readable explanation.
        reason: String,
    },
}

impl Verdict {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Verdict::Authorized)
    }
}

/// Everything the gate looked at, plus what it decided.
///
/// Ephemeral: built once per cycle and consumed immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityDecision {
    pub action: String,
    pub context: Context,
    /// Drift computed over the intentions committed before this action.
    pub drift_score: f64,
    pub verdict: Verdict,
}

impl AuthorityDecision {
    pub fn authorized(&self) -> bool {
        self.verdict.is_authorized()
    }
}
