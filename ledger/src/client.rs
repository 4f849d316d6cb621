//! The `LedgerClient` trait and its wire types.

use quorum_types::{Amount, Asset, LedgerAddress, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{LedgerError, LedgerTxHash};

/// One signer's witness over an unsigned payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Witness {
    pub public_key: PublicKey,
    pub signature: Signature,
}

/// A fully-witnessed transaction ready for submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedPayload {
    /// The unsigned payload bytes the witnesses signed, hex-encoded on the wire.
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
    pub witnesses: Vec<Witness>,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

/// A balance entry on a ledger account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset: Asset,
    pub amount: Amount,
}

/// Current on-ledger state of an account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountState {
    pub address: LedgerAddress,
    pub sequence: u64,
    pub balances: Vec<AssetBalance>,
}

/// A base fee quote in the ledger's smallest unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee(pub u64);

/// One entry of an account's on-chain signer list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignerEntry {
    pub public_key: PublicKey,
    pub weight: u32,
}

/// The external ledger client.
///
/// All calls are synchronous; `submit` is the only unbounded-latency
/// operation and takes an explicit timeout. A timed-out submission may or
/// may not have landed — resubmission hazards are the implementation's
/// concern, never guessed at by callers.
pub trait LedgerClient {
    fn submit(
        &self,
        payload: &SignedPayload,
        timeout: Duration,
    ) -> Result<LedgerTxHash, LedgerError>;

    fn load_account_state(&self, address: &LedgerAddress) -> Result<AccountState, LedgerError>;

    fn fetch_base_fee(&self) -> Result<Fee, LedgerError>;

    /// Push a wallet's logical signer list to the on-chain account.
    fn update_signer_list(
        &self,
        address: &LedgerAddress,
        signers: &[SignerEntry],
    ) -> Result<(), LedgerError>;

    /// One-time activation of a freshly created account.
    fn activate_account(&self, address: &LedgerAddress) -> Result<(), LedgerError>;
}

impl<T: LedgerClient + ?Sized> LedgerClient for std::sync::Arc<T> {
    fn submit(
        &self,
        payload: &SignedPayload,
        timeout: Duration,
    ) -> Result<LedgerTxHash, LedgerError> {
        (**self).submit(payload, timeout)
    }

    fn load_account_state(&self, address: &LedgerAddress) -> Result<AccountState, LedgerError> {
        (**self).load_account_state(address)
    }

    fn fetch_base_fee(&self) -> Result<Fee, LedgerError> {
        (**self).fetch_base_fee()
    }

    fn update_signer_list(
        &self,
        address: &LedgerAddress,
        signers: &[SignerEntry],
    ) -> Result<(), LedgerError> {
        (**self).update_signer_list(address, signers)
    }

    fn activate_account(&self, address: &LedgerAddress) -> Result<(), LedgerError> {
        (**self).activate_account(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_payload_json_roundtrip() {
        let payload = SignedPayload {
            payload: vec![1, 2, 3],
            witnesses: vec![Witness {
                public_key: PublicKey([5u8; 32]),
                signature: Signature([9u8; 64]),
            }],
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("010203"));
        let back: SignedPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.payload, vec![1, 2, 3]);
        assert_eq!(back.witnesses.len(), 1);
    }
}
