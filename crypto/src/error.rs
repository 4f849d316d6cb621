use quorum_types::Chain;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid mnemonic phrase: {0}")]
    InvalidMnemonic(String),

    #[error("unsupported chain: {0}")]
    UnsupportedChain(Chain),

    #[error("key derivation failed: {0}")]
    DerivationFailed(String),
}
