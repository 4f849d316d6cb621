//! The encrypted vault record and its Argon2id + AES-256-GCM envelope.
//!
//! Encryption of the master secret:
//! 1. Argon2id derives a 32-byte encryption key from the PIN + random salt
//! 2. AES-256-GCM encrypts the secret with a random 96-bit nonce
//! 3. The record carries every parameter needed for future decryption,
//!    hex-encoded, plus an explicit schema version

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use quorum_types::Timestamp;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::VaultError;

/// Current persisted record schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Algorithm identifier stored in every record.
pub const ALGORITHM_ID: &str = "argon2id-aes-256-gcm";

/// Argon2id defaults: 64 MB memory, 3 iterations, 1 lane of parallelism.
/// Costs well over 100ms on commodity hardware.
pub const DEFAULT_MEMORY_KIB: u32 = 65536;
pub const DEFAULT_ITERATIONS: u32 = 3;
pub const DEFAULT_PARALLELISM: u32 = 1;

const KEY_LEN: usize = 32;
const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// KDF parameters for Argon2id. Stored alongside the ciphertext so older
/// records remain decryptable after defaults change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_MEMORY_KIB,
            iterations: DEFAULT_ITERATIONS,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

/// The persisted vault record. Owned exclusively by the vault; mutated only
/// on setup, PIN change, and biometric enable/disable.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptedVaultRecord {
    pub schema_version: u32,
    pub algorithm_id: String,
    pub kdf: KdfParams,
    /// Hex-encoded salt.
    pub salt: String,
    /// Hex-encoded nonce.
    pub nonce: String,
    /// Hex-encoded ciphertext of the master secret.
    pub ciphertext: String,
    pub biometric_enabled: bool,
    /// Hex-encoded nonce for the biometric-credential ciphertext.
    #[serde(default)]
    pub biometric_nonce: Option<String>,
    /// Hex-encoded ciphertext of the master secret under the biometric credential.
    #[serde(default)]
    pub biometric_ciphertext: Option<String>,
    pub last_modified: Timestamp,
}

impl EncryptedVaultRecord {
    /// Reject records from a future (or mangled) schema before touching crypto.
    pub fn check_schema(&self) -> Result<(), VaultError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(VaultError::UnsupportedSchema(self.schema_version));
        }
        if self.algorithm_id != ALGORITHM_ID {
            return Err(VaultError::Corrupted(format!(
                "unknown algorithm id: {}",
                self.algorithm_id
            )));
        }
        Ok(())
    }
}

/// Derive a 32-byte encryption key from a PIN and salt using Argon2id.
pub fn derive_pin_key(pin: &str, salt: &[u8], kdf: &KdfParams) -> Result<[u8; 32], VaultError> {
    let params = Params::new(
        kdf.memory_kib,
        kdf.iterations,
        kdf.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| VaultError::Kdf(format!("argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; 32];
    argon2
        .hash_password_into(pin.as_bytes(), salt, &mut output)
        .map_err(|e| VaultError::Kdf(format!("argon2 hashing: {e}")))?;

    Ok(output)
}

/// Encrypt the master-secret bytes under a PIN, producing a fresh record.
pub fn seal(
    plaintext: &[u8],
    pin: &str,
    kdf: &KdfParams,
    now: Timestamp,
) -> Result<EncryptedVaultRecord, VaultError> {
    let mut rng = rand::thread_rng();

    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill_bytes(&mut nonce_bytes);

    let mut key = derive_pin_key(pin, &salt, kdf)?;
    let ciphertext = encrypt_raw(&key, &nonce_bytes, plaintext);
    key.zeroize();
    let ciphertext = ciphertext?;

    Ok(EncryptedVaultRecord {
        schema_version: SCHEMA_VERSION,
        algorithm_id: ALGORITHM_ID.to_string(),
        kdf: kdf.clone(),
        salt: hex::encode(salt),
        nonce: hex::encode(nonce_bytes),
        ciphertext: hex::encode(&ciphertext),
        biometric_enabled: false,
        biometric_nonce: None,
        biometric_ciphertext: None,
        last_modified: now,
    })
}

/// Attempt authenticated decryption of a record with a PIN.
///
/// Returns `Ok(None)` on authentication failure (wrong PIN) — an expected,
/// frequent outcome, not a fault. Structural damage to the record surfaces
/// as `Corrupted`.
pub fn open(record: &EncryptedVaultRecord, pin: &str) -> Result<Option<Vec<u8>>, VaultError> {
    record.check_schema()?;

    let salt = decode_field(&record.salt, "salt")?;
    let nonce = decode_field(&record.nonce, "nonce")?;
    let ciphertext = decode_field(&record.ciphertext, "ciphertext")?;

    if nonce.len() != NONCE_LEN {
        return Err(VaultError::Corrupted(format!(
            "nonce length {} != {NONCE_LEN}",
            nonce.len()
        )));
    }

    let mut key = derive_pin_key(pin, &salt, &record.kdf)?;
    let result = decrypt_raw(&key, &nonce, &ciphertext);
    key.zeroize();
    Ok(result)
}

/// Encrypt plaintext under a raw 32-byte key (biometric credential path).
pub fn encrypt_raw(
    key: &[u8; 32],
    nonce_bytes: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, VaultError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::Cipher(format!("AES key init: {e}")))?;
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Cipher(format!("encryption failed: {e}")))
}

/// Authenticated decryption under a raw 32-byte key. `None` means the key was
/// wrong or the ciphertext was tampered with.
pub fn decrypt_raw(key: &[u8; 32], nonce_bytes: &[u8], ciphertext: &[u8]) -> Option<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key).ok()?;
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher.decrypt(nonce, ciphertext).ok()
}

fn decode_field(hex_value: &str, field: &str) -> Result<Vec<u8>, VaultError> {
    hex::decode(hex_value).map_err(|e| VaultError::Corrupted(format!("invalid {field} hex: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_kdf() -> KdfParams {
        // Keep Argon2 cheap in tests; production defaults are exercised by
        // the Default impl test below.
        KdfParams {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn seal_open_roundtrip() {
        let record = seal(b"my secret phrase", "1234", &fast_kdf(), Timestamp::new(1)).unwrap();
        let opened = open(&record, "1234").unwrap().unwrap();
        assert_eq!(opened, b"my secret phrase");
    }

    #[test]
    fn wrong_pin_returns_none() {
        let record = seal(b"secret", "1234", &fast_kdf(), Timestamp::new(1)).unwrap();
        assert!(open(&record, "4321").unwrap().is_none());
    }

    #[test]
    fn record_has_current_schema() {
        let record = seal(b"secret", "pin", &fast_kdf(), Timestamp::new(1)).unwrap();
        assert_eq!(record.schema_version, SCHEMA_VERSION);
        assert_eq!(record.algorithm_id, ALGORITHM_ID);
        assert!(!record.biometric_enabled);
    }

    #[test]
    fn unknown_schema_rejected() {
        let mut record = seal(b"secret", "pin", &fast_kdf(), Timestamp::new(1)).unwrap();
        record.schema_version = 99;
        assert!(matches!(
            open(&record, "pin"),
            Err(VaultError::UnsupportedSchema(99))
        ));
    }

    #[test]
    fn mangled_salt_is_corruption_not_auth_failure() {
        let mut record = seal(b"secret", "pin", &fast_kdf(), Timestamp::new(1)).unwrap();
        record.salt = "zz".to_string();
        assert!(matches!(open(&record, "pin"), Err(VaultError::Corrupted(_))));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let mut record = seal(b"secret", "pin", &fast_kdf(), Timestamp::new(1)).unwrap();
        let mut bytes = hex::decode(&record.ciphertext).unwrap();
        bytes[0] ^= 0xFF;
        record.ciphertext = hex::encode(bytes);
        assert!(open(&record, "pin").unwrap().is_none());
    }

    #[test]
    fn different_pins_produce_different_ciphertext() {
        let r1 = seal(b"secret", "pin1", &fast_kdf(), Timestamp::new(1)).unwrap();
        let r2 = seal(b"secret", "pin2", &fast_kdf(), Timestamp::new(1)).unwrap();
        assert_ne!(r1.ciphertext, r2.ciphertext);
    }

    #[test]
    fn default_kdf_params_are_slow() {
        let kdf = KdfParams::default();
        assert_eq!(kdf.memory_kib, 65536);
        assert_eq!(kdf.iterations, 3);
    }

    #[test]
    fn unknown_record_fields_fail_deserialization() {
        let record = seal(b"secret", "pin", &fast_kdf(), Timestamp::new(1)).unwrap();
        let mut value = serde_json::to_value(&record).unwrap();
        value["surprise"] = serde_json::json!(true);
        let result: Result<EncryptedVaultRecord, _> = serde_json::from_value(value);
        assert!(result.is_err());
    }
}
