//! Decision memory: an append-only log of committed decisions.
//!
//! `JsonlDecisionRecorder` writes one JSON object per line to a file.
//! `InMemoryDecisionRecorder` keeps entries in a shared `Vec` for tests and
//! embedding.

use std::{
    fs::{self, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tracing::debug;

use lri_contracts::{
    error::{LriError, LriResult},
    outbound::DecisionRecord,
};
use lri_core::traits::DecisionRecorder;

use crate::relations::{RelationIndex, RelationKind};

const COLLABORATOR: &str = "decision-memory";

fn link_record(relations: Option<&RelationIndex>, entry: &DecisionRecord) -> LriResult<()> {
    match relations {
        Some(index) => index.link(
            &entry.agent_id,
            entry.record_id.to_string(),
            RelationKind::DmpRecord,
        ),
        None => Ok(()),
    }
}

fn delivery_failed(reason: String) -> LriError {
    LriError::DeliveryFailed {
        collaborator: COLLABORATOR.to_string(),
        reason,
    }
}

// ── JSONL file ────────────────────────────────────────────────────────────────

/// Appends each decision as a single JSON line.
///
/// Parent directories are created on first write. Concurrent `record` calls
/// from one recorder are serialized so lines never interleave.
#[derive(Debug)]
pub struct JsonlDecisionRecorder {
    path: PathBuf,
    write_lock: Mutex<()>,
    relations: Option<RelationIndex>,
}

impl JsonlDecisionRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            relations: None,
        }
    }

    /// Link every recorded decision to its agent in `relations`.
    pub fn with_relations(mut self, relations: RelationIndex) -> Self {
        self.relations = Some(relations);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record written so far. A missing file is an empty log.
    pub fn read_all(&self) -> LriResult<Vec<DecisionRecord>> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(delivery_failed(format!(
                    "failed to open '{}': {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let mut records = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| delivery_failed(format!("read error: {}", e)))?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| {
                delivery_failed(format!("malformed entry on line {}: {}", n + 1, e))
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

impl DecisionRecorder for JsonlDecisionRecorder {
    fn record(&self, entry: &DecisionRecord) -> LriResult<()> {
        let line = serde_json::to_string(entry)
            .map_err(|e| delivery_failed(format!("failed to serialize decision: {}", e)))?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| delivery_failed(format!("write lock poisoned: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                delivery_failed(format!("failed to create '{}': {}", parent.display(), e))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                delivery_failed(format!("failed to open '{}': {}", self.path.display(), e))
            })?;
        writeln!(file, "{}", line)
            .map_err(|e| delivery_failed(format!("failed to append decision: {}", e)))?;

        debug!(
            agent_id = %entry.agent_id,
            decision = %entry.decision,
            path = %self.path.display(),
            "decision recorded"
        );
        link_record(self.relations.as_ref(), entry)
    }
}

// ── In-memory ─────────────────────────────────────────────────────────────────

/// Keeps every decision in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDecisionRecorder {
    entries: Arc<Mutex<Vec<DecisionRecord>>>,
    relations: Option<RelationIndex>,
}

impl InMemoryDecisionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relations(mut self, relations: RelationIndex) -> Self {
        self.relations = Some(relations);
        self
    }

    /// All decisions recorded so far, in order.
    pub fn entries(&self) -> Vec<DecisionRecord> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DecisionRecorder for InMemoryDecisionRecorder {
    fn record(&self, entry: &DecisionRecord) -> LriResult<()> {
        self.entries
            .lock()
            .map_err(|e| delivery_failed(format!("log lock poisoned: {}", e)))?
            .push(entry.clone());
        link_record(self.relations.as_ref(), entry)
    }
}
