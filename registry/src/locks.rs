//! Per-wallet mutual exclusion.
//!
//! The unit of locking is the wallet id: operations against different
//! wallets proceed concurrently, while mutations of the same wallet are
//! serialized for their whole read-modify-write cycle.

use quorum_types::WalletId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Lazily-populated map of per-wallet locks.
#[derive(Default)]
pub struct WalletLockMap {
    locks: Mutex<HashMap<WalletId, Arc<Mutex<()>>>>,
}

impl WalletLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for one wallet, created on first use.
    pub fn lock_for(&self, wallet_id: &WalletId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            locks
                .entry(wallet_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

/// Acquire a per-wallet guard, surviving poisoning (the protected state
/// lives in the store, not inside the mutex).
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|e| e.into_inner())
}
