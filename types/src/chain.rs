//! Supported ledger chains and their derivation path templates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A ledger chain the derivation engine knows a path template for.
///
/// Each chain carries one fixed BIP-44 style path template; the account
/// index is the only variable component. Whether the chain's native keypair
/// conversion is implemented is a property of the derivation engine, not of
/// this enum — `Ethereum` is declared here but derivation for it is
/// rejected until a secp256k1 conversion rule exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    Stellar,
    Solana,
    Ethereum,
}

impl Chain {
    /// Render the chain's derivation path for the given account index.
    pub fn derivation_path(&self, account_index: u32) -> String {
        match self {
            Chain::Stellar => format!("m/44'/148'/{account_index}'"),
            Chain::Solana => format!("m/44'/501'/{account_index}'"),
            Chain::Ethereum => format!("m/44'/60'/0'/0/{account_index}"),
        }
    }

    /// Whether the workspace has a native keypair conversion rule for this chain.
    pub fn has_ed25519_keys(&self) -> bool {
        matches!(self, Chain::Stellar | Chain::Solana)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Chain::Stellar => "stellar",
            Chain::Solana => "solana",
            Chain::Ethereum => "ethereum",
        };
        write!(f, "{name}")
    }
}
