//! # lri-relay
//!
//! Reference outbound collaborators for the LRI cycle engine.
//!
//! - [`dmp`]: decision memory. Committed decisions go to an append-only log.
//! - [`ltp`]: thread transport. Committed snapshots are published as
//!   `IDENTITY_SNAPSHOT` events.
//! - [`relations`]: optional index linking each subject to the events and
//!   decisions delivered for it.
//!
//! The engine treats both as fire-and-forget; their errors are logged and
//! never undo a committed cycle.

pub mod dmp;
pub mod ltp;
pub mod relations;

pub use dmp::{InMemoryDecisionRecorder, JsonlDecisionRecorder};
pub use ltp::{InMemoryThreadBus, TracingTransmitter};
pub use relations::{Relation, RelationIndex, RelationKind};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use lri_contracts::{
        authority::Context,
        cycle::CycleSnapshot,
        error::LriError,
        identity::{SubjectId, GENESIS_HASH},
        metrics::AgentMetrics,
        outbound::{DecisionRecord, IDENTITY_SNAPSHOT},
    };
    use lri_core::traits::{DecisionRecorder, Transmitter};
    use serde_json::json;

    use super::*;

    fn decision(agent: &str, action: &str) -> DecisionRecord {
        let context: Context = json!({ "source": "test" }).as_object().cloned().unwrap();
        DecisionRecord::new(
            SubjectId::new(agent),
            "learn",
            action,
            context,
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
        )
    }

    fn snapshot(agent: &str) -> CycleSnapshot {
        CycleSnapshot {
            subject_id: SubjectId::new(agent),
            trajectory: vec![],
            head_hash: GENESIS_HASH.to_string(),
            metrics: AgentMetrics {
                actions: 0,
                drift: 0.0,
            },
        }
    }

    // ── Decision memory ──────────────────────────────────────────────────────

    #[test]
    fn jsonl_recorder_appends_one_line_per_decision() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = JsonlDecisionRecorder::new(dir.path().join("dmp.jsonl"));

        recorder.record(&decision("a1", "study")).unwrap();
        recorder.record(&decision("a1", "review")).unwrap();

        let raw = std::fs::read_to_string(recorder.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);

        let first: serde_json::Value = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
        assert_eq!(first["agent_id"], "a1");
        assert_eq!(first["decision"], "study");
        assert_eq!(first["intention"], "learn");
        assert_eq!(first["context"]["source"], "test");
    }

    #[test]
    fn jsonl_recorder_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("nested").join("dmp.jsonl");
        let recorder = JsonlDecisionRecorder::new(&path);

        recorder.record(&decision("a1", "study")).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn jsonl_read_all_round_trips_records() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = JsonlDecisionRecorder::new(dir.path().join("dmp.jsonl"));
        let written = vec![decision("a1", "study"), decision("a2", "plan")];
        for entry in &written {
            recorder.record(entry).unwrap();
        }
        assert_eq!(recorder.read_all().unwrap(), written);
    }

    #[test]
    fn jsonl_read_all_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = JsonlDecisionRecorder::new(dir.path().join("never-written.jsonl"));
        assert!(recorder.read_all().unwrap().is_empty());
    }

    #[test]
    fn jsonl_read_all_reports_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dmp.jsonl");
        let recorder = JsonlDecisionRecorder::new(&path);
        recorder.record(&decision("a1", "study")).unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut f| std::io::Write::write_all(&mut f, b"{not json\n"))
            .unwrap();

        let err = recorder.read_all().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn jsonl_unwritable_path_is_delivery_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        let recorder = JsonlDecisionRecorder::new(dir.path());
        let err = recorder.record(&decision("a1", "study")).unwrap_err();
        assert!(matches!(err, LriError::DeliveryFailed { .. }));
    }

    #[test]
    fn in_memory_recorder_clones_share_log() {
        let recorder = InMemoryDecisionRecorder::new();
        let handle = recorder.clone();
        assert!(handle.is_empty());

        recorder.record(&decision("a1", "study")).unwrap();
        recorder.record(&decision("a2", "plan")).unwrap();

        let entries = handle.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].decision, "plan");
        assert_ne!(entries[0].record_id, entries[1].record_id);
    }

    // ── Thread transport ─────────────────────────────────────────────────────

    #[test]
    fn bus_wraps_snapshots_in_identity_events() {
        let bus = InMemoryThreadBus::new();
        bus.transmit(&snapshot("a1")).unwrap();

        let event = bus.latest().unwrap();
        assert_eq!(event.kind, IDENTITY_SNAPSHOT);
        assert_eq!(event.subject_id, SubjectId::new("a1"));
        assert_eq!(event.payload, snapshot("a1"));
        assert_eq!(event.event_id.get_version_num(), 4);
    }

    #[test]
    fn bus_filters_by_subject() {
        let bus = InMemoryThreadBus::new();
        let reader = bus.clone();
        for agent in ["a1", "a2", "a1"] {
            bus.transmit(&snapshot(agent)).unwrap();
        }
        assert_eq!(reader.events().len(), 3);
        assert_eq!(reader.events_for(&SubjectId::new("a1")).len(), 2);
        assert!(reader.events_for(&SubjectId::new("a3")).is_empty());
    }

    #[test]
    fn tracing_transmitter_never_fails() {
        assert!(TracingTransmitter::new().transmit(&snapshot("a1")).is_ok());
    }

    // ── Relations ────────────────────────────────────────────────────────────

    #[test]
    fn bus_links_each_event_to_its_subject() {
        let relations = RelationIndex::new();
        let bus = InMemoryThreadBus::new().with_relations(relations.clone());
        bus.transmit(&snapshot("a1")).unwrap();
        bus.transmit(&snapshot("a2")).unwrap();

        let linked = relations.list(&SubjectId::new("a1"));
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].kind, RelationKind::LtpEvent);
        assert_eq!(linked[0].to, bus.events_for(&SubjectId::new("a1"))[0].event_id.to_string());
    }

    #[test]
    fn recorders_link_decisions_to_their_agent() {
        let relations = RelationIndex::new();
        let dir = tempfile::tempdir().unwrap();
        let jsonl = JsonlDecisionRecorder::new(dir.path().join("dmp.jsonl"))
            .with_relations(relations.clone());
        let memory = InMemoryDecisionRecorder::new().with_relations(relations.clone());

        let first = decision("a1", "study");
        let second = decision("a1", "plan");
        jsonl.record(&first).unwrap();
        memory.record(&second).unwrap();

        let linked = relations.list(&SubjectId::new("a1"));
        assert_eq!(linked.len(), 2);
        assert!(linked.iter().all(|r| r.kind == RelationKind::DmpRecord));
        assert_eq!(linked[0].to, first.record_id.to_string());
        assert_eq!(linked[1].to, second.record_id.to_string());
    }

    #[test]
    fn transmitters_without_an_index_link_nothing() {
        let relations = RelationIndex::new();
        InMemoryThreadBus::new().transmit(&snapshot("a1")).unwrap();
        TracingTransmitter::new().transmit(&snapshot("a1")).unwrap();
        assert!(relations.list(&SubjectId::new("a1")).is_empty());
    }

    #[test]
    fn list_matches_either_end_of_a_link() {
        let relations = RelationIndex::new();
        let a1 = SubjectId::new("a1");
        let a2 = SubjectId::new("a2");
        relations.link(&a1, "a2", RelationKind::LtpEvent).unwrap();
        relations.link(&a2, "evt-9", RelationKind::LtpEvent).unwrap();

        assert_eq!(relations.list(&a1).len(), 1);
        assert_eq!(relations.list(&a2).len(), 2);
        assert!(relations.list(&SubjectId::new("a3")).is_empty());
    }

    #[test]
    fn unlink_removes_only_the_matching_kind() {
        let relations = RelationIndex::new();
        let a1 = SubjectId::new("a1");
        relations.link(&a1, "x", RelationKind::LtpEvent).unwrap();
        relations.link(&a1, "x", RelationKind::DmpRecord).unwrap();

        assert!(relations.unlink(&a1, "x", RelationKind::LtpEvent).unwrap());
        assert!(!relations.unlink(&a1, "x", RelationKind::LtpEvent).unwrap());

        let left = relations.list(&a1);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].kind, RelationKind::DmpRecord);
    }

    #[test]
    fn relation_serializes_kind_as_type() {
        let relation = Relation {
            from: SubjectId::new("a1"),
            to: "r-1".to_string(),
            kind: RelationKind::DmpRecord,
        };
        assert_eq!(
            serde_json::to_value(&relation).unwrap(),
            json!({ "from": "a1", "to": "r-1", "type": "dmp_record" })
        );
    }
}
