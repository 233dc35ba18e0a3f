//! JSON-file implementation of `RecordStore`.
//!
//! One file per subject under a root directory, named by the SHA-256 of the
//! subject id so arbitrary ids map to safe file names. Each file holds the
//! full persisted record: subject id, trajectory, and head hash.
//!
//! Writes go to a sibling temp file and are renamed into place, so a crash
//! mid-write cannot leave a partially-written record visible to readers.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use sha2::{Digest, Sha256};
use tracing::debug;

use lri_contracts::{
    error::{LriError, LriResult},
    identity::{IdentityRecord, SubjectId},
};

use crate::store::{check_extends, RecordStore};

/// A directory of `<sha256(subject_id)>.json` record files.
///
/// The extends check and the write are serialized within this process; separate
/// processes writing the same directory are not coordinated.
#[derive(Debug)]
pub struct JsonFileRecordStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileRecordStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> LriResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| LriError::PersistenceFailure {
            reason: format!("failed to create store directory '{}': {}", root.display(), e),
        })?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file a subject's record lives in.
    pub fn path_for(&self, subject_id: &SubjectId) -> PathBuf {
        let digest = Sha256::digest(subject_id.as_str().as_bytes());
        self.root.join(format!("{}.json", hex::encode(digest)))
    }

    fn read_record(path: &Path) -> LriResult<IdentityRecord> {
        let contents = fs::read_to_string(path).map_err(|e| LriError::PersistenceFailure {
            reason: format!("failed to read record '{}': {}", path.display(), e),
        })?;
        serde_json::from_str(&contents).map_err(|e| LriError::PersistenceFailure {
            reason: format!("failed to parse record '{}': {}", path.display(), e),
        })
    }
}

impl RecordStore for JsonFileRecordStore {
    fn get(&self, subject_id: &SubjectId) -> LriResult<Option<IdentityRecord>> {
        let path = self.path_for(subject_id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_record(&path).map(Some)
    }

    fn put_if_extends(&self, record: &IdentityRecord) -> LriResult<()> {
        let _guard = self.write_lock.lock().map_err(|e| LriError::PersistenceFailure {
            reason: format!("file store lock poisoned: {}", e),
        })?;

        check_extends(self.get(&record.subject_id)?.as_ref(), record)?;

        let json = serde_json::to_vec_pretty(record).map_err(|e| LriError::PersistenceFailure {
            reason: format!("failed to serialize record: {}", e),
        })?;
        let path = self.path_for(&record.subject_id);
        write_atomic(&path, &json)?;

        debug!(
            subject_id = %record.subject_id,
            path = %path.display(),
            chain_length = record.len(),
            "record written"
        );
        Ok(())
    }

    fn subjects(&self) -> LriResult<Vec<SubjectId>> {
        let entries = fs::read_dir(&self.root).map_err(|e| LriError::PersistenceFailure {
            reason: format!("failed to list '{}': {}", self.root.display(), e),
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| LriError::PersistenceFailure {
                    reason: format!("failed to list '{}': {}", self.root.display(), e),
                })?
                .path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                ids.push(Self::read_record(&path)?.subject_id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Write `data` to `path` via a sibling `.json.tmp` file and a rename.
fn write_atomic(path: &Path, data: &[u8]) -> LriResult<()> {
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, data).map_err(|e| LriError::PersistenceFailure {
        reason: format!("failed to write '{}': {}", tmp_path.display(), e),
    })?;
    fs::rename(&tmp_path, path).map_err(|e| LriError::PersistenceFailure {
        reason: format!("failed to move record into '{}': {}", path.display(), e),
    })
}
