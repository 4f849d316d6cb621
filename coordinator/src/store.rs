//! Durable storage for pending transactions.

use quorum_types::{TxId, WalletId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::CoordinatorError;
use crate::transaction::{PendingTransaction, TxStatus};

pub trait TxStore {
    fn get(&self, tx_id: &TxId) -> Result<Option<PendingTransaction>, CoordinatorError>;
    fn put(&self, tx: &PendingTransaction) -> Result<(), CoordinatorError>;
    fn list_by_wallet(&self, wallet_id: &WalletId)
        -> Result<Vec<PendingTransaction>, CoordinatorError>;
    /// Every transaction still in a non-terminal state, across all wallets.
    fn list_open(&self) -> Result<Vec<PendingTransaction>, CoordinatorError>;
}

impl<T: TxStore + ?Sized> TxStore for Arc<T> {
    fn get(&self, tx_id: &TxId) -> Result<Option<PendingTransaction>, CoordinatorError> {
        (**self).get(tx_id)
    }

    fn put(&self, tx: &PendingTransaction) -> Result<(), CoordinatorError> {
        (**self).put(tx)
    }

    fn list_by_wallet(
        &self,
        wallet_id: &WalletId,
    ) -> Result<Vec<PendingTransaction>, CoordinatorError> {
        (**self).list_by_wallet(wallet_id)
    }

    fn list_open(&self) -> Result<Vec<PendingTransaction>, CoordinatorError> {
        (**self).list_open()
    }
}

/// In-memory store for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryTxStore {
    txs: Mutex<HashMap<TxId, PendingTransaction>>,
}

impl MemoryTxStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.txs.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TxStore for MemoryTxStore {
    fn get(&self, tx_id: &TxId) -> Result<Option<PendingTransaction>, CoordinatorError> {
        let txs = self.txs.lock().map_err(poisoned)?;
        Ok(txs.get(tx_id).cloned())
    }

    fn put(&self, tx: &PendingTransaction) -> Result<(), CoordinatorError> {
        let mut txs = self.txs.lock().map_err(poisoned)?;
        txs.insert(tx.tx_id.clone(), tx.clone());
        Ok(())
    }

    fn list_by_wallet(
        &self,
        wallet_id: &WalletId,
    ) -> Result<Vec<PendingTransaction>, CoordinatorError> {
        let txs = self.txs.lock().map_err(poisoned)?;
        let mut found: Vec<_> = txs
            .values()
            .filter(|t| &t.wallet_id == wallet_id)
            .cloned()
            .collect();
        found.sort_by_key(|t| t.created_at);
        Ok(found)
    }

    fn list_open(&self) -> Result<Vec<PendingTransaction>, CoordinatorError> {
        let txs = self.txs.lock().map_err(poisoned)?;
        Ok(txs
            .values()
            .filter(|t| !t.status.is_terminal())
            .cloned()
            .collect())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> CoordinatorError {
    CoordinatorError::Storage("transaction store lock poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_types::{Amount, Asset, LedgerAddress, Timestamp, UserId};

    fn tx(id: &str, wallet: &str, created: u64, status: TxStatus) -> PendingTransaction {
        let intent = crate::transaction::TransferIntent {
            tx_id: TxId::new(id),
            wallet_id: WalletId::new(wallet),
            source: LedgerAddress::new("src"),
            destination: LedgerAddress::new("dst"),
            asset: Asset::native(),
            amount: Amount::new(1),
            memo: None,
            sequence: 7,
            base_fee: 100,
            created_at: Timestamp::new(created),
        };
        PendingTransaction {
            tx_id: TxId::new(id),
            wallet_id: WalletId::new(wallet),
            initiated_by: UserId::new("alice"),
            intent,
            unsigned_payload: vec![1, 2, 3],
            signatures: Vec::new(),
            required_signatures: 2,
            status,
            created_at: Timestamp::new(created),
            expires_at: Timestamp::new(created + 100),
            executed_at: None,
            ledger_tx_hash: None,
            failure_reason: None,
            schema_version: crate::transaction::TX_SCHEMA_VERSION,
        }
    }

    #[test]
    fn list_by_wallet_sorted_by_creation() {
        let store = MemoryTxStore::new();
        store.put(&tx("t2", "w1", 20, TxStatus::Pending)).unwrap();
        store.put(&tx("t1", "w1", 10, TxStatus::Pending)).unwrap();
        store.put(&tx("t3", "w2", 5, TxStatus::Pending)).unwrap();

        let listed = store.list_by_wallet(&WalletId::new("w1")).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].tx_id, TxId::new("t1"));
        assert_eq!(listed[1].tx_id, TxId::new("t2"));
    }

    #[test]
    fn list_open_excludes_terminal() {
        let store = MemoryTxStore::new();
        store.put(&tx("t1", "w1", 1, TxStatus::Pending)).unwrap();
        store.put(&tx("t2", "w1", 2, TxStatus::Approved)).unwrap();
        store.put(&tx("t3", "w1", 3, TxStatus::Executed)).unwrap();
        store.put(&tx("t4", "w1", 4, TxStatus::Expired)).unwrap();

        let open = store.list_open().unwrap();
        assert_eq!(open.len(), 2);
    }
}
