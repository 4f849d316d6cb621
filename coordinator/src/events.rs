//! Compliance audit events.
//!
//! Every state transition of a pending transaction is reported to a
//! [`ComplianceObserver`]. Delivery is fire-and-forget: an observer cannot
//! veto or delay the transition it is told about.

use quorum_ledger::LedgerTxHash;
use quorum_types::{Amount, Asset, SignerId, Timestamp, TxId, UserId, WalletId};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuditEvent {
    TransactionInitiated {
        tx_id: TxId,
        wallet_id: WalletId,
        initiated_by: UserId,
        asset: Asset,
        amount: Amount,
        at: Timestamp,
    },
    SignatureAdded {
        tx_id: TxId,
        wallet_id: WalletId,
        signer_id: SignerId,
        collected: u32,
        required: u32,
        at: Timestamp,
    },
    TransactionApproved {
        tx_id: TxId,
        wallet_id: WalletId,
        at: Timestamp,
    },
    TransactionExecuted {
        tx_id: TxId,
        wallet_id: WalletId,
        ledger_tx_hash: LedgerTxHash,
        at: Timestamp,
    },
    TransactionRejected {
        tx_id: TxId,
        wallet_id: WalletId,
        rejected_by: Option<UserId>,
        reason: String,
        at: Timestamp,
    },
    TransactionExpired {
        tx_id: TxId,
        wallet_id: WalletId,
        at: Timestamp,
    },
}

impl AuditEvent {
    pub fn tx_id(&self) -> &TxId {
        match self {
            Self::TransactionInitiated { tx_id, .. }
            | Self::SignatureAdded { tx_id, .. }
            | Self::TransactionApproved { tx_id, .. }
            | Self::TransactionExecuted { tx_id, .. }
            | Self::TransactionRejected { tx_id, .. }
            | Self::TransactionExpired { tx_id, .. } => tx_id,
        }
    }
}

/// Receives audit events. Implementations must not panic; they are invoked
/// inline with the transition they describe.
pub trait ComplianceObserver {
    fn record(&self, event: &AuditEvent);
}

impl<T: ComplianceObserver + ?Sized> ComplianceObserver for Arc<T> {
    fn record(&self, event: &AuditEvent) {
        (**self).record(event)
    }
}

/// Drops every event. The default when no compliance sink is wired up.
#[derive(Default)]
pub struct NullComplianceObserver;

impl ComplianceObserver for NullComplianceObserver {
    fn record(&self, _event: &AuditEvent) {}
}

/// In-memory event log for tests and local inspection.
#[derive(Default)]
pub struct MemoryComplianceLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryComplianceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn events_for(&self, tx_id: &TxId) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.tx_id() == tx_id)
            .collect()
    }
}

impl ComplianceObserver for MemoryComplianceLog {
    fn record(&self, event: &AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_log_filters_by_tx() {
        let log = MemoryComplianceLog::new();
        let tx_a = TxId::new("a");
        let tx_b = TxId::new("b");
        log.record(&AuditEvent::TransactionApproved {
            tx_id: tx_a.clone(),
            wallet_id: WalletId::new("w"),
            at: Timestamp::new(1),
        });
        log.record(&AuditEvent::TransactionExpired {
            tx_id: tx_b,
            wallet_id: WalletId::new("w"),
            at: Timestamp::new(2),
        });
        assert_eq!(log.events().len(), 2);
        assert_eq!(log.events_for(&tx_a).len(), 1);
    }
}
