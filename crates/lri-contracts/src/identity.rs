//! Agent identity records and the transitions that make up their trajectory.
//!
//! An `IdentityRecord` is owned by the continuity ledger. Other crates read
//! it freely but only the ledger produces new versions of it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The head hash of an agent that has never committed a transition.
///
/// 64 hex zeros, shared by every fresh record.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Opaque agent identifier.
///
/// The runtime never interprets the string; it is only used as a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One committed, hash-linked entry in an agent's trajectory.
///
/// Transitions are never edited after creation. `continuity_hash` commits to
/// the previous head hash plus the three content fields, so changing any of
/// them is detectable by re-walking the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// What the agent did.
    pub action: String,
    /// Declared purpose of the action.
    pub intention: String,
    /// When the transition was created (UTC).
    pub timestamp: DateTime<Utc>,
    /// Lowercase hex SHA-256 digest linking this transition to its predecessor.
    pub continuity_hash: String,
}

/// The full continuity state of one agent.
///
/// Invariant: `head_hash` equals the `continuity_hash` of the last
/// transition, or `GENESIS_HASH` when `trajectory` is empty. This is also
/// the persisted shape written by record stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub subject_id: SubjectId,
    pub trajectory: Vec<Transition>,
    pub head_hash: String,
}

impl IdentityRecord {
    /// A record with no history, anchored at the genesis hash.
    pub fn genesis(subject_id: SubjectId) -> Self {
        Self {
            subject_id,
            trajectory: Vec::new(),
            head_hash: GENESIS_HASH.to_string(),
        }
    }

    /// Number of committed transitions.
    pub fn len(&self) -> usize {
        self.trajectory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectory.is_empty()
    }

    /// The most recent transition, if any.
    pub fn last(&self) -> Option<&Transition> {
        self.trajectory.last()
    }

    /// True when the record has never been appended to.
    pub fn is_genesis(&self) -> bool {
        self.trajectory.is_empty() && self.head_hash == GENESIS_HASH
    }
}
