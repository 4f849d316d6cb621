//! Off-device replication of the encrypted vault record.
//!
//! The blob store only ever receives ciphertext and is never trusted to
//! enforce the PIN. Content is addressed by the SHA-256 of the serialized
//! record, so a restored blob can be verified against the requested id
//! before it is parsed.

use quorum_types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::VaultError;
use crate::record::EncryptedVaultRecord;

/// Content identifier: hex SHA-256 of the stored blob.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(String);

impl ContentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Metadata stored alongside a replicated record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub schema_version: u32,
    pub last_modified: Timestamp,
}

/// External blob/backup store boundary: get/put by content identifier.
pub trait BlobStore {
    fn put(
        &self,
        key: &UserId,
        blob: &[u8],
        metadata: &BackupMetadata,
    ) -> Result<ContentId, VaultError>;

    fn get(&self, key: &UserId, content_id: &ContentId) -> Result<Option<Vec<u8>>, VaultError>;
}

fn content_id_for(blob: &[u8]) -> ContentId {
    ContentId(hex::encode(Sha256::digest(blob)))
}

/// Replicate an encrypted record to the blob store. Returns the content id
/// the caller needs for a later restore.
pub fn replicate<B: BlobStore>(
    store: &B,
    user: &UserId,
    record: &EncryptedVaultRecord,
) -> Result<ContentId, VaultError> {
    let blob = serde_json::to_vec(record)
        .map_err(|e| VaultError::Backup(format!("serialize record: {e}")))?;
    let metadata = BackupMetadata {
        schema_version: record.schema_version,
        last_modified: record.last_modified,
    };

    let stored_id = store.put(user, &blob, &metadata)?;
    let expected = content_id_for(&blob);
    if stored_id != expected {
        return Err(VaultError::Backup(format!(
            "store returned unexpected content id {}, expected {}",
            stored_id.as_str(),
            expected.as_str()
        )));
    }
    Ok(stored_id)
}

/// Fetch and verify a replicated record. The blob's hash must match the
/// requested content id; a mismatch means the store returned damaged or
/// substituted data.
pub fn restore<B: BlobStore>(
    store: &B,
    user: &UserId,
    content_id: &ContentId,
) -> Result<Option<EncryptedVaultRecord>, VaultError> {
    let Some(blob) = store.get(user, content_id)? else {
        return Ok(None);
    };

    if &content_id_for(&blob) != content_id {
        return Err(VaultError::Backup(
            "restored blob does not match content id".to_string(),
        ));
    }

    let record: EncryptedVaultRecord = serde_json::from_slice(&blob)
        .map_err(|e| VaultError::Corrupted(format!("invalid backup record: {e}")))?;
    record.check_schema()?;
    Ok(Some(record))
}

/// In-memory blob store for tests.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<(UserId, ContentId), Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Corrupt a stored blob in place (test hook).
    pub fn tamper(&self, key: &UserId, content_id: &ContentId) {
        let mut blobs = self.blobs.lock().unwrap();
        if let Some(blob) = blobs.get_mut(&(key.clone(), content_id.clone())) {
            if let Some(byte) = blob.first_mut() {
                *byte ^= 0xFF;
            }
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(
        &self,
        key: &UserId,
        blob: &[u8],
        _metadata: &BackupMetadata,
    ) -> Result<ContentId, VaultError> {
        let content_id = content_id_for(blob);
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| VaultError::Backup("blob store lock poisoned".to_string()))?;
        blobs.insert((key.clone(), content_id.clone()), blob.to_vec());
        Ok(content_id)
    }

    fn get(&self, key: &UserId, content_id: &ContentId) -> Result<Option<Vec<u8>>, VaultError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| VaultError::Backup("blob store lock poisoned".to_string()))?;
        Ok(blobs.get(&(key.clone(), content_id.clone())).cloned())
    }
}
