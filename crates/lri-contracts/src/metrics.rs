//! Per-agent metrics derived from the committed trajectory.

use serde::{Deserialize, Serialize};

use crate::identity::IdentityRecord;

/// Counters and intention history for one agent.
///
/// A cache over the ledger: `from_record` rebuilds it exactly by replaying
/// the trajectory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Number of committed actions. Never decreases.
    pub actions_count: u64,
    /// Declared intentions in commit order.
    pub intentions: Vec<String>,
}

impl MetricsSnapshot {
    /// Rebuild metrics by replaying every transition in `record`.
    pub fn from_record(record: &IdentityRecord) -> Self {
        Self {
            actions_count: record.trajectory.len() as u64,
            intentions: record
                .trajectory
                .iter()
                .map(|t| t.intention.clone())
                .collect(),
        }
    }

    /// Fold one committed action into the snapshot.
    pub fn record(&mut self, intention: &str) {
        self.actions_count += 1;
        self.intentions.push(intention.to_string());
    }
}

/// The metrics block attached to every cycle snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub actions: u64,
    pub drift: f64,
}
