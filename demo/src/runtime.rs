//! Wires the ledger, gate, relay, and observer from command-line options.

use std::{path::PathBuf, sync::Arc};

use tracing::info;

use lri_contracts::error::LriResult;
use lri_core::{traits::ContinuityLedger, CycleEngine, MetricsStore};
use lri_ledger::{InMemoryRecordStore, JsonFileRecordStore, Ledger};
use lri_observer::Observer;
use lri_policy::TomlAuthorityGate;
use lri_relay::{JsonlDecisionRecorder, RelationIndex, TracingTransmitter};

/// Where state lives and which policy applies.
#[derive(Debug, Clone, Default)]
pub struct RuntimeOptions {
    pub store_dir: Option<PathBuf>,
    pub policy: Option<PathBuf>,
    pub dmp_log: Option<PathBuf>,
}

pub struct Runtime {
    pub engine: CycleEngine,
    pub observer: Observer,
    /// Links from each subject to the events and decisions sent on its behalf.
    pub relations: RelationIndex,
}

impl Runtime {
    pub fn build(options: &RuntimeOptions) -> LriResult<Self> {
        let ledger: Arc<dyn ContinuityLedger> = match &options.store_dir {
            Some(dir) => {
                info!(store_dir = %dir.display(), "using JSON file ledger");
                Arc::new(Ledger::new(JsonFileRecordStore::open(dir)?))
            }
            None => Arc::new(Ledger::new(InMemoryRecordStore::new())),
        };

        let gate = match &options.policy {
            Some(path) => {
                info!(policy = %path.display(), "loading authority policy");
                TomlAuthorityGate::from_file(path)?
            }
            None => TomlAuthorityGate::default(),
        };

        let relations = RelationIndex::new();
        let mut engine = CycleEngine::new(ledger, Arc::new(gate), Arc::new(MetricsStore::new()))
            .with_transmitter(Box::new(
                TracingTransmitter::new().with_relations(relations.clone()),
            ));
        if let Some(path) = &options.dmp_log {
            engine = engine.with_recorder(Box::new(
                JsonlDecisionRecorder::new(path).with_relations(relations.clone()),
            ));
        }

        let observer = Observer::for_engine(&engine);
        Ok(Self {
            engine,
            observer,
            relations,
        })
    }
}
