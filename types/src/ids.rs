//! Opaque identifier newtypes for wallets, users, signers, and transactions.
//!
//! Identifiers are plain strings on the wire and in the key-value store.
//! Freshly minted identifiers are 16 random bytes, hex-encoded.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

fn random_hex_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Mint a fresh random identifier.
            pub fn random() -> Self {
                Self(random_hex_id())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Identifies one multi-signature wallet.
    WalletId
}

string_id! {
    /// Identifies a user account (external to this engine).
    UserId
}

string_id! {
    /// Identifies one signer entry within a wallet.
    SignerId
}

string_id! {
    /// Identifies a pending transaction proposal.
    TxId
}

string_id! {
    /// A ledger-level account address (opaque to this engine).
    LedgerAddress
}
