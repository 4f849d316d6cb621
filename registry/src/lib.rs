//! Multi-signature wallet registry.
//!
//! Models one ledger account as an N-of-M threshold wallet: an ordered,
//! permissioned list of signers and the policy governing who may sign, add,
//! remove, or re-threshold. The registry is the logical source of truth; the
//! on-chain signer list follows it, and a failed chain sync never rolls the
//! logical state back.

pub mod config;
pub mod error;
pub mod locks;
pub mod registry;
pub mod signer;
pub mod store;

pub use config::{MultiSigWalletConfig, WalletStatus, WALLET_SCHEMA_VERSION};
pub use error::RegistryError;
pub use locks::WalletLockMap;
pub use registry::{verification_challenge, MultiSigRegistry, SyncStatus, WalletCreation};
pub use signer::{Signer, SignerPermissions, SignerRole, SignerStatus};
pub use store::{MemoryWalletStore, WalletDirectory, WalletStore};
