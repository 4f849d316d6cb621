//! Durable storage for encrypted vault records.
//!
//! Backends implement [`VaultStore`]; the vault depends only on the trait.
//! `put` must be atomic from the caller's perspective: a crash mid-write must
//! leave either the old record or the new one, never a torn file.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use quorum_types::UserId;

use crate::error::VaultError;
use crate::record::EncryptedVaultRecord;

/// Key-value storage for vault records, keyed by user.
pub trait VaultStore {
    fn get(&self, user: &UserId) -> Result<Option<EncryptedVaultRecord>, VaultError>;
    /// Atomic write: readers observe the old record or the new one, nothing between.
    fn put(&self, user: &UserId, record: &EncryptedVaultRecord) -> Result<(), VaultError>;
    /// Returns whether a record existed.
    fn delete(&self, user: &UserId) -> Result<bool, VaultError>;
}

/// In-memory store for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryVaultStore {
    records: Mutex<HashMap<UserId, EncryptedVaultRecord>>,
}

impl MemoryVaultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VaultStore for MemoryVaultStore {
    fn get(&self, user: &UserId) -> Result<Option<EncryptedVaultRecord>, VaultError> {
        let records = self.records.lock().map_err(poisoned)?;
        Ok(records.get(user).cloned())
    }

    fn put(&self, user: &UserId, record: &EncryptedVaultRecord) -> Result<(), VaultError> {
        let mut records = self.records.lock().map_err(poisoned)?;
        records.insert(user.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, user: &UserId) -> Result<bool, VaultError> {
        let mut records = self.records.lock().map_err(poisoned)?;
        Ok(records.remove(user).is_some())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> VaultError {
    VaultError::Storage("vault store lock poisoned".to_string())
}

/// File-backed store: one JSON file per user under a base directory.
///
/// Writes go to a temporary sibling file and are renamed into place, so a
/// crash mid-write leaves the previous record intact.
pub struct FileVaultStore {
    base_dir: PathBuf,
}

impl FileVaultStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, VaultError> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)
            .map_err(|e| VaultError::Storage(format!("create vault dir: {e}")))?;
        Ok(Self { base_dir })
    }

    fn record_path(&self, user: &UserId) -> PathBuf {
        self.base_dir.join(format!("{user}.vault.json"))
    }
}

impl VaultStore for FileVaultStore {
    fn get(&self, user: &UserId) -> Result<Option<EncryptedVaultRecord>, VaultError> {
        let path = self.record_path(user);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(VaultError::Storage(format!("read vault record: {e}"))),
        };
        let record: EncryptedVaultRecord = serde_json::from_str(&json)
            .map_err(|e| VaultError::Corrupted(format!("invalid vault record JSON: {e}")))?;
        Ok(Some(record))
    }

    fn put(&self, user: &UserId, record: &EncryptedVaultRecord) -> Result<(), VaultError> {
        let path = self.record_path(user);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| VaultError::Storage(format!("serialize vault record: {e}")))?;
        std::fs::write(&tmp, json)
            .map_err(|e| VaultError::Storage(format!("write vault record: {e}")))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| VaultError::Storage(format!("commit vault record: {e}")))?;
        Ok(())
    }

    fn delete(&self, user: &UserId) -> Result<bool, VaultError> {
        let path = self.record_path(user);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(VaultError::Storage(format!("delete vault record: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{seal, KdfParams};
    use quorum_types::Timestamp;

    fn sample_record() -> EncryptedVaultRecord {
        let kdf = KdfParams {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        };
        seal(b"phrase", "pin", &kdf, Timestamp::new(1)).unwrap()
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryVaultStore::new();
        let user = UserId::new("alice");
        assert!(store.get(&user).unwrap().is_none());

        store.put(&user, &sample_record()).unwrap();
        assert!(store.get(&user).unwrap().is_some());

        assert!(store.delete(&user).unwrap());
        assert!(!store.delete(&user).unwrap());
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVaultStore::new(dir.path()).unwrap();
        let user = UserId::new("bob");

        let record = sample_record();
        store.put(&user, &record).unwrap();

        let loaded = store.get(&user).unwrap().unwrap();
        assert_eq!(loaded.ciphertext, record.ciphertext);

        assert!(store.delete(&user).unwrap());
        assert!(store.get(&user).unwrap().is_none());
    }

    #[test]
    fn file_store_overwrite_replaces_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVaultStore::new(dir.path()).unwrap();
        let user = UserId::new("carol");

        let first = sample_record();
        let second = sample_record();
        store.put(&user, &first).unwrap();
        store.put(&user, &second).unwrap();

        let loaded = store.get(&user).unwrap().unwrap();
        assert_eq!(loaded.ciphertext, second.ciphertext);
    }

    #[test]
    fn file_store_corrupt_json_is_loud() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileVaultStore::new(dir.path()).unwrap();
        let user = UserId::new("dave");

        std::fs::write(dir.path().join("dave.vault.json"), "{ not json").unwrap();
        assert!(matches!(store.get(&user), Err(VaultError::Corrupted(_))));
    }
}
