//! The pending transaction record and its signature entries.

use quorum_ledger::LedgerTxHash;
use quorum_types::{
    Amount, Asset, LedgerAddress, PublicKey, Signature, SignerId, Timestamp, TxId, UserId,
    WalletId,
};
use serde::{Deserialize, Serialize};

/// Current persisted transaction record schema version.
pub const TX_SCHEMA_VERSION: u32 = 1;

/// Lifecycle of a pending transaction.
///
/// `Pending` collects signatures; everything else is terminal except
/// `Approved`, which awaits (or retries) ledger submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    /// Collecting signatures.
    Pending,
    /// Threshold met, not yet confirmed on the ledger.
    Approved,
    /// Submitted and accepted by the ledger.
    Executed,
    /// Explicitly rejected by a signer.
    Rejected,
    /// Signature window elapsed before the threshold was met.
    Expired,
}

impl TxStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Rejected | Self::Expired)
    }
}

/// Where a signature was produced, kept for the audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureOrigin {
    pub device: String,
    pub app_version: String,
}

/// One collected signature over the transaction's unsigned payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionSignature {
    pub signer_id: SignerId,
    pub signer_public_key: PublicKey,
    pub signature: Signature,
    pub signed_at: Timestamp,
    pub origin: SignatureOrigin,
}

/// What the wallet is being asked to do. Serialized deterministically into
/// the unsigned payload every signer signs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferIntent {
    pub tx_id: TxId,
    pub wallet_id: WalletId,
    pub source: LedgerAddress,
    pub destination: LedgerAddress,
    pub asset: Asset,
    pub amount: Amount,
    #[serde(default)]
    pub memo: Option<String>,
    /// Account sequence at initiation time.
    pub sequence: u64,
    /// Base fee quote at initiation time, in the ledger's smallest unit.
    pub base_fee: u64,
    pub created_at: Timestamp,
}

/// A transaction moving through the signature-collection state machine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub tx_id: TxId,
    pub wallet_id: WalletId,
    pub initiated_by: UserId,
    pub intent: TransferIntent,
    /// The exact bytes every signer signs. Fixed at initiation.
    pub unsigned_payload: Vec<u8>,
    pub signatures: Vec<TransactionSignature>,
    /// Threshold snapshot taken at initiation; later wallet re-thresholding
    /// does not move the goalposts of an in-flight transaction.
    pub required_signatures: u32,
    pub status: TxStatus,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    #[serde(default)]
    pub executed_at: Option<Timestamp>,
    #[serde(default)]
    pub ledger_tx_hash: Option<LedgerTxHash>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    pub schema_version: u32,
}

impl PendingTransaction {
    pub fn signature_count(&self) -> u32 {
        self.signatures.len() as u32
    }

    pub fn has_signature_from(&self, signer_id: &SignerId) -> bool {
        self.signatures.iter().any(|s| &s.signer_id == signer_id)
    }

    pub fn threshold_met(&self) -> bool {
        self.signature_count() >= self.required_signatures
    }

    pub fn is_past_expiry(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}
