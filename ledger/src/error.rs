use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The hash the ledger assigns to an accepted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerTxHash(String);

impl LedgerTxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LedgerTxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger failures, by category. Callers branch on the category only; the
/// carried text is preserved for diagnosis, never parsed.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger rejected the transaction: {0}")]
    Rejected(String),

    #[error("ledger request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),
}
