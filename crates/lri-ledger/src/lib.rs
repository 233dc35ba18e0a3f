//! # lri-ledger
//!
//! Append-only, SHA-256 hash-chained continuity ledger for LRI agents.
//!
//! ## Overview
//!
//! Every committed action becomes a `Transition` whose `continuity_hash`
//! commits to the previous head hash and the transition's own fields.
//! Editing any stored transition, even by a single byte, breaks the chain and
//! is reported by `verify_record`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lri_ledger::{InMemoryRecordStore, Ledger};
//! use lri_core::traits::ContinuityLedger;
//!
//! let ledger = Ledger::new(InMemoryRecordStore::new());
//! let record = ledger.load(&subject_id)?;
//! let next = ledger.append(&record, "study", "learn", Utc::now());
//! ledger.commit(&next)?;
//! assert!(ledger.verify(&next).status.is_verified());
//! ```

pub mod chain;
pub mod file;
pub mod ledger;
pub mod memory;
pub mod store;

pub use chain::{ensure_verified, hash_transition, verify_record};
pub use file::JsonFileRecordStore;
pub use ledger::Ledger;
pub use memory::InMemoryRecordStore;
pub use store::{check_extends, RecordStore};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use lri_contracts::{
        audit::VerificationStatus,
        error::{LriError, LriResult},
        identity::{IdentityRecord, SubjectId, GENESIS_HASH},
    };
    use lri_core::traits::ContinuityLedger;

    use super::{
        chain::{canonical_payload, ensure_verified, hash_transition, verify_record},
        check_extends, InMemoryRecordStore, JsonFileRecordStore, Ledger, RecordStore,
    };

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 10, minute, 0).unwrap()
    }

    /// A record with `n` appended transitions, built through the ledger.
    fn chained(ledger: &dyn ContinuityLedger, subject: &str, n: u32) -> IdentityRecord {
        let mut record = ledger.load(&SubjectId::new(subject)).unwrap();
        for i in 0..n {
            record = ledger.append(&record, &format!("step{}", i), &format!("intent{}", i % 2), ts(i));
        }
        record
    }

    /// A store whose writes always fail.
    struct UnavailableStore;

    impl RecordStore for UnavailableStore {
        fn get(&self, _subject_id: &SubjectId) -> LriResult<Option<IdentityRecord>> {
            Ok(None)
        }

        fn put_if_extends(&self, _record: &IdentityRecord) -> LriResult<()> {
            Err(LriError::PersistenceFailure {
                reason: "disk full".to_string(),
            })
        }

        fn subjects(&self) -> LriResult<Vec<SubjectId>> {
            Ok(vec![])
        }
    }

    // ── Hashing ───────────────────────────────────────────────────────────────

    /// Appending advances the head and each hash can be recomputed by hand.
    #[test]
    fn test_continuity_hashing() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let identity = ledger.load(&SubjectId::new("test_agent_continuity")).unwrap();
        assert_eq!(identity.head_hash, GENESIS_HASH);

        let first = ledger.append(&identity, "step1", "init", ts(0));
        let hash1 = first.head_hash.clone();
        assert_ne!(hash1, GENESIS_HASH);
        assert_eq!(first.trajectory[0].continuity_hash, hash1);

        let second = ledger.append(&first, "step2", "follow_up", ts(1));
        let hash2 = second.head_hash.clone();
        assert_ne!(hash2, hash1);

        assert_eq!(hash_transition(&hash1, "step2", "follow_up", &ts(1)), hash2);
    }

    /// The hash input is a key-sorted JSON object with an RFC 3339 timestamp.
    #[test]
    fn test_canonical_payload_layout() {
        let payload = canonical_payload(GENESIS_HASH, "step1", "init", &ts(0));
        let expected = format!(
            r#"{{"action":"step1","intention":"init","prev_hash":"{}","timestamp":"2023-01-01T10:00:00Z"}}"#,
            GENESIS_HASH
        );
        assert_eq!(String::from_utf8(payload).unwrap(), expected);

        let hash = hash_transition(GENESIS_HASH, "step1", "init", &ts(0));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    /// Replaying N appends from genesis reproduces every stored hash.
    #[test]
    fn test_replay_reproduces_hashes() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let record = chained(&ledger, "replay", 12);

        let mut prev = GENESIS_HASH.to_string();
        for t in &record.trajectory {
            let recomputed = hash_transition(&prev, &t.action, &t.intention, &t.timestamp);
            assert_eq!(recomputed, t.continuity_hash);
            prev = recomputed;
        }
        assert_eq!(prev, record.head_hash);
    }

    /// Sub-second precision survives hashing and a JSON round-trip.
    #[test]
    fn test_subsecond_timestamp_round_trip() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let precise = ts(0) + Duration::nanoseconds(123_456_789);
        let record = ledger.append(
            &ledger.load(&SubjectId::new("ns")).unwrap(),
            "tick",
            "measure",
            precise,
        );

        let json = serde_json::to_string(&record).unwrap();
        let decoded: IdentityRecord = serde_json::from_str(&json).unwrap();
        assert!(verify_record(&decoded).status.is_verified());
    }

    // ── Verification ──────────────────────────────────────────────────────────

    #[test]
    fn test_verify_empty() {
        let record = IdentityRecord::genesis(SubjectId::new("nobody"));
        let report = verify_record(&record);
        assert_eq!(report.status, VerificationStatus::Verified);
        assert_eq!(report.chain_length, 0);
        assert_eq!(report.head_hash, GENESIS_HASH);
    }

    #[test]
    fn test_verify_intact_chain() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let record = chained(&ledger, "intact", 5);
        let report = ledger.verify(&record);
        assert!(report.status.is_verified());
        assert_eq!(report.chain_length, 5);
        assert!(ensure_verified(&report).is_ok());
    }

    /// Mutating any single field of a stored transition is detected.
    #[test]
    fn test_tamper_detection_per_field() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let record = chained(&ledger, "tamper", 4);

        let tamperers: Vec<Box<dyn Fn(&mut IdentityRecord)>> = vec![
            Box::new(|r: &mut IdentityRecord| r.trajectory[1].action = "TAMPERED".to_string()),
            Box::new(|r: &mut IdentityRecord| r.trajectory[1].intention = "TAMPERED".to_string()),
            Box::new(|r: &mut IdentityRecord| r.trajectory[1].timestamp = r.trajectory[1].timestamp + Duration::seconds(1)),
            Box::new(|r: &mut IdentityRecord| r.trajectory[1].continuity_hash = "f".repeat(64)),
        ];

        for tamper in tamperers {
            let mut forged = record.clone();
            tamper(&mut forged);
            match verify_record(&forged).status {
                VerificationStatus::Mismatch { position, .. } => assert_eq!(position, 1),
                other => panic!("expected Mismatch at 1, got {:?}", other),
            }
        }
    }

    /// A head hash that does not point at the tip is reported separately.
    #[test]
    fn test_head_mismatch_detection() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let mut record = chained(&ledger, "head", 3);
        record.head_hash = record.trajectory[1].continuity_hash.clone();

        let report = verify_record(&record);
        assert!(matches!(report.status, VerificationStatus::HeadMismatch { .. }));

        match ensure_verified(&report) {
            Err(LriError::ChainVerificationMismatch { position, .. }) => assert_eq!(position, 3),
            other => panic!("expected ChainVerificationMismatch, got {:?}", other),
        }
    }

    /// Dropping a transition from the middle breaks every later link.
    #[test]
    fn test_removed_transition_is_detected() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let mut record = chained(&ledger, "gap", 4);
        record.trajectory.remove(1);

        match verify_record(&record).status {
            VerificationStatus::Mismatch { position, .. } => assert_eq!(position, 1),
            other => panic!("expected Mismatch, got {:?}", other),
        }
    }

    // ── Ledger + stores ───────────────────────────────────────────────────────

    #[test]
    fn test_load_unknown_subject_is_genesis() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let record = ledger.load(&SubjectId::new("ghost")).unwrap();
        assert!(record.is_genesis());
        // Loading must not provision anything.
        assert!(ledger.store().is_empty());
    }

    #[test]
    fn test_commit_then_load() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let record = chained(&ledger, "a1", 2);
        ledger.commit(&record).unwrap();

        assert_eq!(ledger.load(&SubjectId::new("a1")).unwrap(), record);
        assert_eq!(ledger.subjects().unwrap(), vec![SubjectId::new("a1")]);
    }

    /// A record built from a stale load must not overwrite a newer chain.
    #[test]
    fn test_stale_commit_rejected() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let base = ledger.load(&SubjectId::new("race")).unwrap();

        let winner = ledger.append(&base, "left", "x", ts(0));
        let loser = ledger.append(&base, "right", "y", ts(0));

        ledger.commit(&winner).unwrap();
        let err = ledger.commit(&loser).unwrap_err();
        assert!(matches!(err, LriError::PersistenceFailure { .. }));
        assert_eq!(ledger.load(&SubjectId::new("race")).unwrap(), winner);
    }

    /// Several transitions appended between commits are stored together.
    #[test]
    fn test_commit_after_several_appends() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let subject = SubjectId::new("batch");

        let first = chained(&ledger, "batch", 1);
        ledger.commit(&first).unwrap();

        let mut next = ledger.load(&subject).unwrap();
        for i in 1..4 {
            next = ledger.append(&next, &format!("step{}", i), "learn", ts(i));
        }
        ledger.commit(&next).unwrap();

        let stored = ledger.load(&subject).unwrap();
        assert_eq!(stored.len(), 4);
        assert_eq!(stored, next);
        assert!(ledger.verify(&stored).status.is_verified());
    }

    /// Editing a committed transition before re-committing is refused.
    #[test]
    fn test_commit_rejects_edited_history() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let subject = SubjectId::new("a1");
        let first = chained(&ledger, "a1", 1);
        ledger.commit(&first).unwrap();

        let mut edited = ledger.append(&first, "step1", "learn", ts(1));
        edited.trajectory[0].action = "REWRITTEN".to_string();

        let err = ledger.commit(&edited).unwrap_err();
        assert!(matches!(err, LriError::PersistenceFailure { .. }));
        let stored = ledger.load(&subject).unwrap();
        assert_eq!(stored, first);
        assert_eq!(stored.trajectory[0].action, "step0");
    }

    /// A fully re-hashed alternative history verifies on its own but still
    /// does not extend the committed chain.
    #[test]
    fn test_commit_rejects_rehashed_fork() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let subject = SubjectId::new("a1");
        let committed = chained(&ledger, "a1", 2);
        ledger.commit(&committed).unwrap();

        let genesis = IdentityRecord::genesis(subject.clone());
        let fork = ledger.append(&genesis, "other", "x", ts(0));
        let fork = ledger.append(&fork, "other", "x", ts(1));
        let fork = ledger.append(&fork, "other", "x", ts(2));
        assert!(ledger.verify(&fork).status.is_verified());

        match ledger.commit(&fork) {
            Err(LriError::PersistenceFailure { reason }) => {
                assert!(reason.contains("position 0"), "unexpected: {reason}");
            }
            other => panic!("expected PersistenceFailure, got {:?}", other),
        }
        assert_eq!(ledger.load(&subject).unwrap(), committed);
    }

    #[test]
    fn test_commit_rejects_truncated_record() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let short = chained(&ledger, "a1", 1);
        let long = ledger.append(&short, "step1", "learn", ts(1));
        ledger.commit(&long).unwrap();

        assert!(ledger.commit(&short).is_err());
        assert_eq!(ledger.load(&SubjectId::new("a1")).unwrap(), long);
    }

    #[test]
    fn test_recommit_of_stored_record_is_accepted() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let record = chained(&ledger, "a1", 2);
        ledger.commit(&record).unwrap();
        ledger.commit(&record).unwrap();
        assert_eq!(ledger.load(&SubjectId::new("a1")).unwrap(), record);
    }

    #[test]
    fn test_check_extends_prefix_rule() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let one = chained(&ledger, "a1", 1);
        let three = chained(&ledger, "a1", 3);
        let other = chained(&ledger, "a2", 0);

        assert!(check_extends(None, &three).is_ok());
        assert!(check_extends(Some(&other), &three).is_ok());
        assert!(check_extends(Some(&one), &three).is_ok());
        assert!(check_extends(Some(&three), &one).is_err());
    }

    #[test]
    fn test_file_store_rejects_edited_history() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(JsonFileRecordStore::open(dir.path()).unwrap());
        let subject = SubjectId::new("disk");
        let committed = chained(&ledger, "disk", 2);
        ledger.commit(&committed).unwrap();

        let genesis = IdentityRecord::genesis(subject.clone());
        let fork = ledger.append(&genesis, "forged", "x", ts(0));
        let fork = ledger.append(&fork, "forged", "x", ts(1));
        let fork = ledger.append(&fork, "forged", "x", ts(2));
        assert!(ledger.commit(&fork).is_err());
        assert_eq!(ledger.load(&subject).unwrap(), committed);
    }

    #[test]
    fn test_create_is_idempotent() {
        let ledger = Ledger::new(InMemoryRecordStore::new());
        let subject = SubjectId::new("explicit");

        let created = ledger.create(&subject).unwrap();
        assert!(created.is_genesis());
        assert_eq!(ledger.store().len(), 1);

        let next = ledger.append(&created, "study", "learn", ts(0));
        ledger.commit(&next).unwrap();

        assert_eq!(ledger.create(&subject).unwrap(), next);
    }

    /// A failed commit leaves the previously committed record visible.
    #[test]
    fn test_failed_commit_surfaces_persistence_failure() {
        let ledger = Ledger::new(UnavailableStore);
        let record = chained(&ledger, "a1", 1);

        let err = ledger.commit(&record).unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert!(ledger.load(&SubjectId::new("a1")).unwrap().is_genesis());
    }

    #[test]
    fn test_file_store_round_trip_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let subject = SubjectId::new("agent/with spaces");

        let record = {
            let ledger = Ledger::new(JsonFileRecordStore::open(dir.path()).unwrap());
            let record = chained(&ledger, subject.as_str(), 3);
            ledger.commit(&record).unwrap();
            record
        };

        let reopened = Ledger::new(JsonFileRecordStore::open(dir.path()).unwrap());
        let loaded = reopened.load(&subject).unwrap();
        assert_eq!(loaded, record);
        assert!(reopened.verify(&loaded).status.is_verified());
        assert_eq!(reopened.subjects().unwrap(), vec![subject.clone()]);

        let path = reopened.store().path_for(&subject);
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists(), "temp file must be renamed away");
    }

    #[test]
    fn test_file_store_detects_on_disk_tampering() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::new(JsonFileRecordStore::open(dir.path()).unwrap());
        let subject = SubjectId::new("disk");
        let record = chained(&ledger, "disk", 2);
        ledger.commit(&record).unwrap();

        let path = ledger.store().path_for(&subject);
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, contents.replace("step0", "stepX")).unwrap();

        let loaded = ledger.load(&subject).unwrap();
        assert!(!ledger.verify(&loaded).status.is_verified());
    }

    #[test]
    fn test_file_store_rejects_corrupt_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileRecordStore::open(dir.path()).unwrap();
        let subject = SubjectId::new("broken");
        std::fs::write(store.path_for(&subject), "{ not json").unwrap();

        match store.get(&subject) {
            Err(LriError::PersistenceFailure { reason }) => {
                assert!(reason.contains("failed to parse record"), "unexpected: {reason}");
            }
            other => panic!("expected PersistenceFailure, got {:?}", other),
        }
    }
}
