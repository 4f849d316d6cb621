use quorum_ledger::LedgerError;
use quorum_registry::RegistryError;
use quorum_types::{SignerId, TxId, WalletId};
use thiserror::Error;

use crate::transaction::TxStatus;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("wallet not found: {0}")]
    WalletNotFound(WalletId),

    #[error("wallet {0} is not active")]
    WalletNotActive(WalletId),

    #[error("transaction not found: {0}")]
    TxNotFound(TxId),

    #[error("not authorized: {0}")]
    NotAuthorized(String),

    #[error("invalid transfer: {0}")]
    InvalidIntent(String),

    #[error("transaction {0} has not met its signature threshold")]
    ThresholdNotMet(TxId),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("transaction state {0:?} does not permit this transition")]
    TerminalState(TxStatus),

    #[error("transaction {0} has expired")]
    Expired(TxId),

    #[error("signer {0} has already signed")]
    AlreadySigned(SignerId),

    #[error("signature does not verify against the transaction payload")]
    BadSignature,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("storage error: {0}")]
    Storage(String),
}
