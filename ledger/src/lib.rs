//! External ledger-client boundary.
//!
//! The registry and coordinator treat the ledger as an opaque collaborator:
//! submit a fully-witnessed payload, read account state, fetch fees, push
//! signer-list updates. Submission is a single blocking call with an explicit
//! caller-supplied timeout; callers pick their own concurrency model. No
//! idempotent-resubmission safety is assumed.

pub mod client;
pub mod error;
pub mod http;
pub mod null;

pub use client::{AccountState, AssetBalance, Fee, LedgerClient, SignedPayload, SignerEntry, Witness};
pub use error::{LedgerError, LedgerTxHash};
pub use http::HttpLedgerClient;
pub use null::{NullLedgerClient, SubmitMode};
