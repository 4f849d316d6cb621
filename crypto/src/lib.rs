//! Deterministic key derivation and signing primitives.
//!
//! The derivation engine is a pure function: a fixed (seed, chain, index)
//! triple always produces the same keypair. Nothing in this crate persists
//! state; session-scoped caching lives in [`cache::KeyCache`] and is owned
//! by whoever holds the unlocked secret.

pub mod cache;
pub mod derive;
pub mod error;
pub mod keys;
pub mod mnemonic;
pub mod sign;

pub use cache::KeyCache;
pub use derive::{derive, ChainCode, DerivedKey, SecretSeed};
pub use error::CryptoError;
pub use keys::{generate_keypair, keypair_from_private, keypair_from_seed, public_from_private};
pub use mnemonic::MasterSecret;
pub use sign::{sign_message, verify_signature};
