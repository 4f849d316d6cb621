//! Pending transaction coordinator.
//!
//! Collects signatures for multi-signature wallet transfers and executes
//! them against the ledger once the wallet's threshold is met. Transactions
//! move pending -> approved -> executed, or terminate as rejected or
//! expired; every transition is reported to a compliance observer.

pub mod coordinator;
pub mod error;
pub mod events;
pub mod store;
pub mod transaction;

pub use coordinator::{CoordinatorConfig, TransactionCoordinator};
pub use error::CoordinatorError;
pub use events::{AuditEvent, ComplianceObserver, MemoryComplianceLog, NullComplianceObserver};
pub use store::{MemoryTxStore, TxStore};
pub use transaction::{
    PendingTransaction, SignatureOrigin, TransactionSignature, TransferIntent, TxStatus,
    TX_SCHEMA_VERSION,
};
