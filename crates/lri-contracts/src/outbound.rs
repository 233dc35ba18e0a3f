//! Records handed to outbound collaborators after a committed cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{authority::Context, cycle::CycleSnapshot, identity::SubjectId};

/// Event kind carried by every snapshot transmission.
pub const IDENTITY_SNAPSHOT: &str = "IDENTITY_SNAPSHOT";

/// One committed decision, as written to the decision memory log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub record_id: Uuid,
    pub agent_id: SubjectId,
    pub intention: String,
    /// The action that was authorized and committed.
    pub decision: String,
    pub context: Context,
    pub timestamp: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(
        agent_id: SubjectId,
        intention: impl Into<String>,
        decision: impl Into<String>,
        context: Context,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            agent_id,
            intention: intention.into(),
            decision: decision.into(),
            context,
            timestamp,
        }
    }
}

/// Envelope for a snapshot published on the thread transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadEvent {
    pub event_id: Uuid,
    pub subject_id: SubjectId,
    pub kind: String,
    pub payload: CycleSnapshot,
    pub timestamp: DateTime<Utc>,
}

impl ThreadEvent {
    pub fn identity_snapshot(payload: CycleSnapshot, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            subject_id: payload.subject_id.clone(),
            kind: IDENTITY_SNAPSHOT.to_string(),
            payload,
            timestamp,
        }
    }
}
