//! Encrypted secret vault.
//!
//! Holds the master secret (a BIP39 recovery phrase) encrypted at rest behind
//! a PIN-derived Argon2id key or a biometric-bound local credential. The
//! persisted record never contains the secret in recoverable plaintext form;
//! the decrypted secret lives only in an in-memory session that is zeroized
//! on lock.

pub mod backup;
pub mod biometric;
pub mod error;
pub mod record;
pub mod store;
pub mod vault;

pub use backup::{replicate, restore, BackupMetadata, BlobStore, ContentId, MemoryBlobStore};
pub use biometric::{BiometricGate, NullBiometricGate};
pub use error::VaultError;
pub use record::{EncryptedVaultRecord, KdfParams, ALGORITHM_ID, SCHEMA_VERSION};
pub use store::{FileVaultStore, MemoryVaultStore, VaultStore};
pub use vault::{SecretVault, VaultConfig, VaultStatus};
