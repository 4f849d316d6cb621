use quorum_types::{SignerId, WalletId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid threshold: {required} of {total}")]
    InvalidThreshold { required: u32, total: u32 },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("duplicate signer: {0}")]
    DuplicateSigner(String),

    #[error("signer not found: {0}")]
    SignerNotFound(SignerId),

    #[error("wallet not found: {0}")]
    WalletNotFound(WalletId),

    #[error("signer verification proof is invalid")]
    BadProof,

    #[error("storage error: {0}")]
    Storage(String),
}
