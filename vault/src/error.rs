use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("vault already initialized; delete it first")]
    AlreadyInitialized,

    #[error("vault not initialized")]
    NotInitialized,

    #[error("vault is locked")]
    Locked,

    #[error("vault record is corrupted: {0}")]
    Corrupted(String),

    #[error("unsupported vault schema version: {0}")]
    UnsupportedSchema(u32),

    #[error("key derivation error: {0}")]
    Kdf(String),

    #[error("cipher error: {0}")]
    Cipher(String),

    #[error("biometric unlock not enabled")]
    BiometricNotEnabled,

    #[error("biometric platform error: {0}")]
    Biometric(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("backup store error: {0}")]
    Backup(String),

    #[error(transparent)]
    Crypto(#[from] quorum_crypto::CryptoError),
}
