//! Subject relation index.
//!
//! Every delivered thread event and decision record is linked back to the
//! subject it belongs to, so a subject's outbound trail can be listed
//! without scanning the transports themselves.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use lri_contracts::{
    error::{LriError, LriResult},
    identity::SubjectId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Subject → thread event id.
    LtpEvent,
    /// Subject → decision record id.
    DmpRecord,
}

/// One directed link from a subject to an outbound artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub from: SubjectId,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: RelationKind,
}

/// Shared, in-memory list of relations. Clones share the same index.
#[derive(Debug, Clone, Default)]
pub struct RelationIndex {
    relations: Arc<Mutex<Vec<Relation>>>,
}

impl RelationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&self, from: &SubjectId, to: impl Into<String>, kind: RelationKind) -> LriResult<()> {
        self.relations
            .lock()
            .map_err(poisoned)?
            .push(Relation {
                from: from.clone(),
                to: to.into(),
                kind,
            });
        Ok(())
    }

    /// Remove every matching link. Returns whether anything was removed.
    pub fn unlink(&self, from: &SubjectId, to: &str, kind: RelationKind) -> LriResult<bool> {
        let mut relations = self.relations.lock().map_err(poisoned)?;
        let before = relations.len();
        relations.retain(|r| !(&r.from == from && r.to == to && r.kind == kind));
        Ok(relations.len() != before)
    }

    /// Relations touching `subject_id` on either end, in link order.
    pub fn list(&self, subject_id: &SubjectId) -> Vec<Relation> {
        let relations = self
            .relations
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone());
        relations
            .into_iter()
            .filter(|r| &r.from == subject_id || r.to == subject_id.as_str())
            .collect()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> LriError {
    LriError::DeliveryFailed {
        collaborator: "relations".to_string(),
        reason: format!("relation index lock poisoned: {}", e),
    }
}
