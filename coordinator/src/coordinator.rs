//! Signature collection and threshold execution.
//!
//! One transaction moves pending -> approved -> executed, or terminates as
//! rejected or expired. All mutations of transactions belonging to the same
//! wallet are serialized on that wallet's lock; different wallets proceed
//! concurrently. Expiry is lazy: a transaction past its signature window is
//! flipped to `Expired` the next time anything touches it, plus whenever
//! [`TransactionCoordinator::sweep_expired`] runs.

use quorum_crypto::verify_signature;
use quorum_ledger::{LedgerClient, LedgerError, SignedPayload, Witness};
use quorum_registry::{MultiSigWalletConfig, Signer, WalletDirectory, WalletLockMap, WalletStatus};
use quorum_types::{Amount, Asset, LedgerAddress, Signature, Timestamp, TxId, UserId, WalletId};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::CoordinatorError;
use crate::events::{AuditEvent, ComplianceObserver};
use crate::store::TxStore;
use crate::transaction::{
    PendingTransaction, SignatureOrigin, TransactionSignature, TransferIntent, TxStatus,
    TX_SCHEMA_VERSION,
};

/// Tunables for the coordinator.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// How long a transaction collects signatures before expiring.
    pub signature_window_secs: u64,
    /// Timeout for the single unbounded-latency ledger call.
    pub submit_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            signature_window_secs: 24 * 60 * 60,
            submit_timeout: Duration::from_secs(30),
        }
    }
}

pub struct TransactionCoordinator<T, W, L, O>
where
    T: TxStore,
    W: WalletDirectory,
    L: LedgerClient,
    O: ComplianceObserver,
{
    txs: T,
    wallets: W,
    ledger: L,
    observer: O,
    config: CoordinatorConfig,
    locks: WalletLockMap,
}

impl<T, W, L, O> TransactionCoordinator<T, W, L, O>
where
    T: TxStore,
    W: WalletDirectory,
    L: LedgerClient,
    O: ComplianceObserver,
{
    pub fn new(txs: T, wallets: W, ledger: L, observer: O, config: CoordinatorConfig) -> Self {
        Self {
            txs,
            wallets,
            ledger,
            observer,
            config,
            locks: WalletLockMap::new(),
        }
    }

    /// Propose a transfer from an active wallet.
    ///
    /// The initiator must be a verified signer with signing capability, and
    /// the transfer must fit within their personal amount ceiling and asset
    /// allow-list. The initiator does not implicitly sign; their signature
    /// arrives through [`Self::sign`] like everyone else's.
    pub fn initiate(
        &self,
        wallet_id: &WalletId,
        initiator: &UserId,
        destination: LedgerAddress,
        asset: Asset,
        amount: Amount,
        memo: Option<String>,
    ) -> Result<PendingTransaction, CoordinatorError> {
        let lock = self.locks.lock_for(wallet_id);
        let _guard = quorum_registry::locks::acquire(&lock);

        let wallet = self.load_wallet(wallet_id)?;
        if wallet.status != WalletStatus::Active {
            return Err(CoordinatorError::WalletNotActive(wallet_id.clone()));
        }

        let signer = self.require_signing_member(&wallet, initiator)?;
        if amount.is_zero() {
            return Err(CoordinatorError::InvalidIntent(
                "transfer amount must be positive".to_string(),
            ));
        }
        if !signer.permissions.allows_amount(amount) {
            return Err(CoordinatorError::LimitExceeded(format!(
                "amount {amount} exceeds the initiator's per-transaction ceiling"
            )));
        }
        if !signer.permissions.allows_asset(&asset) {
            return Err(CoordinatorError::LimitExceeded(format!(
                "asset {asset} is outside the initiator's allow-list"
            )));
        }

        // Pin the payload to the account's current sequence and a fresh fee
        // quote so every signer witnesses the same concrete transaction.
        let account = self.ledger.load_account_state(&wallet.ledger_address)?;
        let base_fee = self.ledger.fetch_base_fee()?;

        let now = Timestamp::now();
        let tx_id = TxId::random();
        let intent = TransferIntent {
            tx_id: tx_id.clone(),
            wallet_id: wallet_id.clone(),
            source: wallet.ledger_address.clone(),
            destination,
            asset: asset.clone(),
            amount,
            memo,
            sequence: account.sequence,
            base_fee: base_fee.0,
            created_at: now,
        };
        let unsigned_payload = serde_json::to_vec(&intent)
            .map_err(|e| CoordinatorError::Storage(format!("intent encoding failed: {e}")))?;

        let tx = PendingTransaction {
            tx_id: tx_id.clone(),
            wallet_id: wallet_id.clone(),
            initiated_by: initiator.clone(),
            intent,
            unsigned_payload,
            signatures: Vec::new(),
            required_signatures: wallet.required_signatures,
            status: TxStatus::Pending,
            created_at: now,
            expires_at: now.plus_secs(self.config.signature_window_secs),
            executed_at: None,
            ledger_tx_hash: None,
            failure_reason: None,
            schema_version: TX_SCHEMA_VERSION,
        };
        self.txs.put(&tx)?;

        self.observer.record(&AuditEvent::TransactionInitiated {
            tx_id,
            wallet_id: wallet_id.clone(),
            initiated_by: initiator.clone(),
            asset,
            amount,
            at: now,
        });
        info!(tx = %tx.tx_id, wallet = %wallet_id, "transaction initiated");
        Ok(tx)
    }

    /// Add one signer's signature over the transaction's unsigned payload.
    ///
    /// When the collected count reaches the threshold snapshot the
    /// transaction flips to `Approved` and submission is attempted in the
    /// same call. A submission timeout leaves it `Approved` for a later
    /// [`Self::execute`] retry; the returned record reflects whichever state
    /// was reached.
    pub fn sign(
        &self,
        tx_id: &TxId,
        signer_user: &UserId,
        signature: Signature,
        origin: SignatureOrigin,
    ) -> Result<PendingTransaction, CoordinatorError> {
        let mut tx = self.load_tx(tx_id)?;
        let lock = self.locks.lock_for(&tx.wallet_id);
        let _guard = quorum_registry::locks::acquire(&lock);

        // Re-read under the lock; another signer may have advanced it.
        tx = self.load_tx(tx_id)?;
        let now = Timestamp::now();
        if let Some(expired) = self.expire_if_due(tx.clone(), now)? {
            return Err(CoordinatorError::Expired(expired.tx_id));
        }
        // Approved means the threshold is already met and submission may have
        // landed; no further signatures are accepted in either case.
        if tx.status != TxStatus::Pending {
            return Err(CoordinatorError::TerminalState(tx.status));
        }

        let wallet = self.load_wallet(&tx.wallet_id)?;
        let signer = self.require_signing_member(&wallet, signer_user)?;
        if tx.has_signature_from(&signer.signer_id) {
            return Err(CoordinatorError::AlreadySigned(signer.signer_id.clone()));
        }
        if !verify_signature(&tx.unsigned_payload, &signature, &signer.signing_public_key) {
            return Err(CoordinatorError::BadSignature);
        }

        tx.signatures.push(TransactionSignature {
            signer_id: signer.signer_id.clone(),
            signer_public_key: signer.signing_public_key.clone(),
            signature,
            signed_at: now,
            origin,
        });
        self.txs.put(&tx)?;
        self.observer.record(&AuditEvent::SignatureAdded {
            tx_id: tx_id.clone(),
            wallet_id: tx.wallet_id.clone(),
            signer_id: signer.signer_id.clone(),
            collected: tx.signature_count(),
            required: tx.required_signatures,
            at: now,
        });
        info!(
            tx = %tx_id,
            collected = tx.signature_count(),
            required = tx.required_signatures,
            "signature collected"
        );

        if tx.threshold_met() {
            tx.status = TxStatus::Approved;
            self.txs.put(&tx)?;
            self.observer.record(&AuditEvent::TransactionApproved {
                tx_id: tx_id.clone(),
                wallet_id: tx.wallet_id.clone(),
                at: now,
            });
            tx = self.submit_approved(tx)?;
        }
        Ok(tx)
    }

    /// Submit an approved transaction to the ledger.
    ///
    /// Idempotent: an already-executed transaction returns its record
    /// unchanged rather than resubmitting.
    pub fn execute(&self, tx_id: &TxId) -> Result<PendingTransaction, CoordinatorError> {
        let tx = self.load_tx(tx_id)?;
        let lock = self.locks.lock_for(&tx.wallet_id);
        let _guard = quorum_registry::locks::acquire(&lock);

        let tx = self.load_tx(tx_id)?;
        match tx.status {
            TxStatus::Executed => Ok(tx),
            TxStatus::Approved => self.submit_approved(tx),
            TxStatus::Pending => Err(CoordinatorError::ThresholdNotMet(tx_id.clone())),
            TxStatus::Rejected | TxStatus::Expired => {
                Err(CoordinatorError::TerminalState(tx.status))
            }
        }
    }

    /// Reject a transaction, recording who and why. Collected signatures are
    /// kept for the audit trail.
    pub fn reject(
        &self,
        tx_id: &TxId,
        rejected_by: &UserId,
        reason: impl Into<String>,
    ) -> Result<PendingTransaction, CoordinatorError> {
        let mut tx = self.load_tx(tx_id)?;
        let lock = self.locks.lock_for(&tx.wallet_id);
        let _guard = quorum_registry::locks::acquire(&lock);

        tx = self.load_tx(tx_id)?;
        let now = Timestamp::now();
        if let Some(expired) = self.expire_if_due(tx.clone(), now)? {
            return Err(CoordinatorError::Expired(expired.tx_id));
        }
        // An approved transaction may already sit on the ledger; only a
        // still-pending one can be vetoed.
        if tx.status != TxStatus::Pending {
            return Err(CoordinatorError::TerminalState(tx.status));
        }

        let wallet = self.load_wallet(&tx.wallet_id)?;
        self.require_signing_member(&wallet, rejected_by)?;

        let reason = reason.into();
        tx.status = TxStatus::Rejected;
        tx.failure_reason = Some(reason.clone());
        self.txs.put(&tx)?;

        self.observer.record(&AuditEvent::TransactionRejected {
            tx_id: tx_id.clone(),
            wallet_id: tx.wallet_id.clone(),
            rejected_by: Some(rejected_by.clone()),
            reason,
            at: now,
        });
        info!(tx = %tx_id, by = %rejected_by, "transaction rejected");
        Ok(tx)
    }

    /// Fetch a transaction, applying lazy expiry.
    pub fn get(&self, tx_id: &TxId) -> Result<Option<PendingTransaction>, CoordinatorError> {
        let Some(tx) = self.txs.get(tx_id)? else {
            return Ok(None);
        };
        let now = Timestamp::now();
        if tx.status != TxStatus::Pending || !tx.is_past_expiry(now) {
            return Ok(Some(tx));
        }

        // The flip is a read-modify-write; take the wallet lock and re-read
        // so a concurrent sign/execute is never overwritten.
        let lock = self.locks.lock_for(&tx.wallet_id);
        let _guard = quorum_registry::locks::acquire(&lock);
        let Some(tx) = self.txs.get(tx_id)? else {
            return Ok(None);
        };
        match self.expire_if_due(tx.clone(), now)? {
            Some(expired) => Ok(Some(expired)),
            None => Ok(Some(tx)),
        }
    }

    /// Transactions of one wallet, lazy expiry applied.
    pub fn list_for_wallet(
        &self,
        wallet_id: &WalletId,
    ) -> Result<Vec<PendingTransaction>, CoordinatorError> {
        let lock = self.locks.lock_for(wallet_id);
        let _guard = quorum_registry::locks::acquire(&lock);

        let now = Timestamp::now();
        let mut listed = Vec::new();
        for tx in self.txs.list_by_wallet(wallet_id)? {
            match self.expire_if_due(tx.clone(), now)? {
                Some(expired) => listed.push(expired),
                None => listed.push(tx),
            }
        }
        Ok(listed)
    }

    /// Expire one transaction if its signature window has elapsed. Returns
    /// the current record either way.
    pub fn expire(&self, tx_id: &TxId) -> Result<PendingTransaction, CoordinatorError> {
        let tx = self.load_tx(tx_id)?;
        let lock = self.locks.lock_for(&tx.wallet_id);
        let _guard = quorum_registry::locks::acquire(&lock);

        let tx = self.load_tx(tx_id)?;
        match self.expire_if_due(tx.clone(), Timestamp::now())? {
            Some(expired) => Ok(expired),
            None => Ok(tx),
        }
    }

    /// Expire every still-pending transaction past its signature window.
    /// Returns how many were flipped.
    pub fn sweep_expired(&self) -> Result<usize, CoordinatorError> {
        let now = Timestamp::now();
        let mut swept = 0;
        for tx in self.txs.list_open()? {
            let lock = self.locks.lock_for(&tx.wallet_id);
            let _guard = quorum_registry::locks::acquire(&lock);
            // Re-read under the lock.
            if let Some(current) = self.txs.get(&tx.tx_id)? {
                if self.expire_if_due(current, now)?.is_some() {
                    swept += 1;
                }
            }
        }
        if swept > 0 {
            info!(count = swept, "expired stale transactions");
        }
        Ok(swept)
    }

    fn expire_if_due(
        &self,
        mut tx: PendingTransaction,
        now: Timestamp,
    ) -> Result<Option<PendingTransaction>, CoordinatorError> {
        // Approved transactions have met their threshold; the window only
        // bounds signature collection.
        if tx.status != TxStatus::Pending || !tx.is_past_expiry(now) {
            return Ok(None);
        }
        tx.status = TxStatus::Expired;
        self.txs.put(&tx)?;
        self.observer.record(&AuditEvent::TransactionExpired {
            tx_id: tx.tx_id.clone(),
            wallet_id: tx.wallet_id.clone(),
            at: now,
        });
        info!(tx = %tx.tx_id, "transaction expired");
        Ok(Some(tx))
    }

    /// Submit an approved transaction. Acceptance and rejection are final;
    /// a timeout keeps the transaction `Approved` because the submission may
    /// or may not have landed, and only a later confirmed outcome may move it.
    fn submit_approved(
        &self,
        mut tx: PendingTransaction,
    ) -> Result<PendingTransaction, CoordinatorError> {
        let payload = SignedPayload {
            payload: tx.unsigned_payload.clone(),
            witnesses: tx
                .signatures
                .iter()
                .map(|s| Witness {
                    public_key: s.signer_public_key.clone(),
                    signature: s.signature.clone(),
                })
                .collect(),
        };

        match self.ledger.submit(&payload, self.config.submit_timeout) {
            Ok(hash) => {
                let now = Timestamp::now();
                tx.status = TxStatus::Executed;
                tx.executed_at = Some(now);
                tx.ledger_tx_hash = Some(hash.clone());
                self.txs.put(&tx)?;
                self.observer.record(&AuditEvent::TransactionExecuted {
                    tx_id: tx.tx_id.clone(),
                    wallet_id: tx.wallet_id.clone(),
                    ledger_tx_hash: hash,
                    at: now,
                });
                info!(tx = %tx.tx_id, "transaction executed");
                Ok(tx)
            }
            Err(LedgerError::Timeout(_)) => {
                warn!(tx = %tx.tx_id, "submission timed out, staying approved");
                Ok(tx)
            }
            Err(e) => {
                // Anything but a timeout is a definitive failure: the
                // transaction did not land and will not. Terminal, with the
                // reason preserved and signatures kept for the audit trail.
                let reason = match e {
                    LedgerError::Rejected(r) => r,
                    other => other.to_string(),
                };
                let now = Timestamp::now();
                tx.status = TxStatus::Rejected;
                tx.failure_reason = Some(reason.clone());
                self.txs.put(&tx)?;
                self.observer.record(&AuditEvent::TransactionRejected {
                    tx_id: tx.tx_id.clone(),
                    wallet_id: tx.wallet_id.clone(),
                    rejected_by: None,
                    reason,
                    at: now,
                });
                warn!(tx = %tx.tx_id, "ledger submission failed, transaction rejected");
                Ok(tx)
            }
        }
    }

    fn load_tx(&self, tx_id: &TxId) -> Result<PendingTransaction, CoordinatorError> {
        self.txs
            .get(tx_id)?
            .ok_or_else(|| CoordinatorError::TxNotFound(tx_id.clone()))
    }

    fn load_wallet(&self, wallet_id: &WalletId) -> Result<MultiSigWalletConfig, CoordinatorError> {
        self.wallets
            .wallet(wallet_id)?
            .ok_or_else(|| CoordinatorError::WalletNotFound(wallet_id.clone()))
    }

    fn require_signing_member<'c>(
        &self,
        wallet: &'c MultiSigWalletConfig,
        user: &UserId,
    ) -> Result<&'c Signer, CoordinatorError> {
        let signer = wallet
            .signer_by_user(user)
            .ok_or_else(|| CoordinatorError::NotAuthorized(format!("{user} is not a signer")))?;
        if !signer.counts_toward_threshold() {
            return Err(CoordinatorError::NotAuthorized(format!(
                "{user} is not a verified signing member"
            )));
        }
        Ok(signer)
    }
}
