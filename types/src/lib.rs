//! Fundamental types for the Quorum wallet engine.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: keys, signatures, identifiers, amounts, chains, and timestamps.

pub mod amount;
pub mod chain;
pub mod ids;
pub mod keys;
pub mod time;

pub use amount::{Amount, Asset};
pub use chain::Chain;
pub use ids::{LedgerAddress, SignerId, TxId, UserId, WalletId};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use time::Timestamp;
