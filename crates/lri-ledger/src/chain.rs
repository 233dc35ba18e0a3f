//! Hash-chain primitives: canonical hashing and chain verification.
//!
//! Each transition's hash is SHA-256 over a canonical JSON object with keys
//! in sorted order:
//!
//! ```text
//! {"action":…,"intention":…,"prev_hash":…,"timestamp":…}
//! ```
//!
//! Keys are inserted in sorted order, which is also the order serde_json's
//! default map keeps them in, so the bytes are identical with or without the
//! `preserve_order` feature. `timestamp` is RFC 3339 in UTC with a `Z`
//! suffix and only as many sub-second digits as the value needs.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use lri_contracts::{
    audit::{ContinuityReport, VerificationStatus},
    error::{LriError, LriResult},
    identity::{IdentityRecord, GENESIS_HASH},
};

/// Render a timestamp the way it enters the hash input.
pub fn canonical_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// The exact bytes hashed for one transition.
pub fn canonical_payload(
    prev_hash: &str,
    action: &str,
    intention: &str,
    timestamp: &DateTime<Utc>,
) -> Vec<u8> {
    let mut fields = Map::new();
    fields.insert("action".to_string(), Value::from(action));
    fields.insert("intention".to_string(), Value::from(intention));
    fields.insert("prev_hash".to_string(), Value::from(prev_hash));
    fields.insert("timestamp".to_string(), Value::from(canonical_timestamp(timestamp)));

    Value::Object(fields).to_string().into_bytes()
}

/// Compute the continuity hash linking a new transition to `prev_hash`.
///
/// Returns a lowercase 64-character hex string.
pub fn hash_transition(
    prev_hash: &str,
    action: &str,
    intention: &str,
    timestamp: &DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_payload(prev_hash, action, intention, timestamp));
    hex::encode(hasher.finalize())
}

/// Re-walk `record` from genesis and report the first inconsistency.
///
/// Checks, in order:
///
/// 1. **Hash correctness**: each transition's stored `continuity_hash`
///    equals the hash recomputed from its predecessor and its own fields.
/// 2. **Head linkage**: `head_hash` equals the last transition's hash, or
///    `GENESIS_HASH` when the trajectory is empty.
///
/// Never fails: a broken chain is a status, not an error.
pub fn verify_record(record: &IdentityRecord) -> ContinuityReport {
    let mut prev = GENESIS_HASH.to_string();
    let mut status = VerificationStatus::Verified;

    for (position, transition) in record.trajectory.iter().enumerate() {
        let recomputed = hash_transition(
            &prev,
            &transition.action,
            &transition.intention,
            &transition.timestamp,
        );
        if recomputed != transition.continuity_hash {
            status = VerificationStatus::Mismatch {
                position,
                expected: recomputed,
                found: transition.continuity_hash.clone(),
            };
            break;
        }
        prev = transition.continuity_hash.clone();
    }

    if status.is_verified() && record.head_hash != prev {
        status = VerificationStatus::HeadMismatch {
            expected: prev,
            found: record.head_hash.clone(),
        };
    }

    ContinuityReport {
        subject_id: record.subject_id.clone(),
        head_hash: record.head_hash.clone(),
        chain_length: record.trajectory.len(),
        status,
    }
}

/// Turn a failed report into `LriError::ChainVerificationMismatch`.
///
/// Used by `Ledger::commit` to refuse broken records and by callers that
/// want a broken chain to abort rather than be reported.
pub fn ensure_verified(report: &ContinuityReport) -> LriResult<()> {
    match &report.status {
        VerificationStatus::Verified => Ok(()),
        VerificationStatus::Mismatch { position, expected, found } => {
            Err(LriError::ChainVerificationMismatch {
                subject_id: report.subject_id.to_string(),
                position: *position,
                reason: format!("stored hash {} but recomputed {}", found, expected),
            })
        }
        VerificationStatus::HeadMismatch { expected, found } => {
            Err(LriError::ChainVerificationMismatch {
                subject_id: report.subject_id.to_string(),
                position: report.chain_length,
                reason: format!("head hash {} does not match chain tip {}", found, expected),
            })
        }
    }
}
