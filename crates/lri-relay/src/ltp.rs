//! Thread transport for committed cycle snapshots.
//!
//! Each snapshot is wrapped in an `IDENTITY_SNAPSHOT` `ThreadEvent` before it
//! leaves the runtime.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::info;

use lri_contracts::{
    cycle::CycleSnapshot,
    error::{LriError, LriResult},
    identity::SubjectId,
    outbound::ThreadEvent,
};
use lri_core::traits::Transmitter;

use crate::relations::{RelationIndex, RelationKind};

fn link_event(relations: Option<&RelationIndex>, event: &ThreadEvent) -> LriResult<()> {
    match relations {
        Some(index) => index.link(
            &event.subject_id,
            event.event_id.to_string(),
            RelationKind::LtpEvent,
        ),
        None => Ok(()),
    }
}

/// Retains every published event. Clones share the same bus.
#[derive(Debug, Clone, Default)]
pub struct InMemoryThreadBus {
    events: Arc<Mutex<Vec<ThreadEvent>>>,
    relations: Option<RelationIndex>,
}

impl InMemoryThreadBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link every published event to its subject in `relations`.
    pub fn with_relations(mut self, relations: RelationIndex) -> Self {
        self.relations = Some(relations);
        self
    }

    /// Every event published so far, in order.
    pub fn events(&self) -> Vec<ThreadEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Events published for one subject, in order.
    pub fn events_for(&self, subject_id: &SubjectId) -> Vec<ThreadEvent> {
        self.events()
            .into_iter()
            .filter(|e| &e.subject_id == subject_id)
            .collect()
    }

    /// The most recent event, if any.
    pub fn latest(&self) -> Option<ThreadEvent> {
        self.events().pop()
    }
}

impl Transmitter for InMemoryThreadBus {
    fn transmit(&self, snapshot: &CycleSnapshot) -> LriResult<()> {
        let event = ThreadEvent::identity_snapshot(snapshot.clone(), Utc::now());
        self.events
            .lock()
            .map_err(|e| LriError::DeliveryFailed {
                collaborator: "thread-bus".to_string(),
                reason: format!("bus lock poisoned: {}", e),
            })?
            .push(event.clone());
        link_event(self.relations.as_ref(), &event)
    }
}

/// Publishes snapshots as `info!` events.
#[derive(Debug, Clone, Default)]
pub struct TracingTransmitter {
    relations: Option<RelationIndex>,
}

impl TracingTransmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relations(mut self, relations: RelationIndex) -> Self {
        self.relations = Some(relations);
        self
    }
}

impl Transmitter for TracingTransmitter {
    fn transmit(&self, snapshot: &CycleSnapshot) -> LriResult<()> {
        let event = ThreadEvent::identity_snapshot(snapshot.clone(), Utc::now());
        info!(
            event_id = %event.event_id,
            kind = %event.kind,
            subject_id = %event.subject_id,
            head_hash = %event.payload.head_hash,
            actions = event.payload.metrics.actions,
            drift = event.payload.metrics.drift,
            "snapshot transmitted"
        );
        link_event(self.relations.as_ref(), &event)
    }
}
