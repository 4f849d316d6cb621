//! Durable storage for wallet configuration records.

use quorum_types::WalletId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::MultiSigWalletConfig;
use crate::error::RegistryError;

/// Key-value storage for wallet records, keyed by wallet id.
pub trait WalletStore {
    fn get(&self, wallet_id: &WalletId) -> Result<Option<MultiSigWalletConfig>, RegistryError>;
    fn put(&self, config: &MultiSigWalletConfig) -> Result<(), RegistryError>;
    fn delete(&self, wallet_id: &WalletId) -> Result<bool, RegistryError>;
}

/// Read-only wallet lookup, the only access the coordinator gets.
pub trait WalletDirectory {
    fn wallet(&self, wallet_id: &WalletId) -> Result<Option<MultiSigWalletConfig>, RegistryError>;
}

impl<T: WalletStore> WalletDirectory for T {
    fn wallet(&self, wallet_id: &WalletId) -> Result<Option<MultiSigWalletConfig>, RegistryError> {
        self.get(wallet_id)
    }
}

impl<T: WalletStore + ?Sized> WalletStore for Arc<T> {
    fn get(&self, wallet_id: &WalletId) -> Result<Option<MultiSigWalletConfig>, RegistryError> {
        (**self).get(wallet_id)
    }

    fn put(&self, config: &MultiSigWalletConfig) -> Result<(), RegistryError> {
        (**self).put(config)
    }

    fn delete(&self, wallet_id: &WalletId) -> Result<bool, RegistryError> {
        (**self).delete(wallet_id)
    }
}

/// In-memory store for tests and ephemeral use.
#[derive(Default)]
pub struct MemoryWalletStore {
    wallets: Mutex<HashMap<WalletId, MultiSigWalletConfig>>,
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.wallets.lock().map(|w| w.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WalletStore for MemoryWalletStore {
    fn get(&self, wallet_id: &WalletId) -> Result<Option<MultiSigWalletConfig>, RegistryError> {
        let wallets = self.wallets.lock().map_err(poisoned)?;
        Ok(wallets.get(wallet_id).cloned())
    }

    fn put(&self, config: &MultiSigWalletConfig) -> Result<(), RegistryError> {
        let mut wallets = self.wallets.lock().map_err(poisoned)?;
        wallets.insert(config.wallet_id.clone(), config.clone());
        Ok(())
    }

    fn delete(&self, wallet_id: &WalletId) -> Result<bool, RegistryError> {
        let mut wallets = self.wallets.lock().map_err(poisoned)?;
        Ok(wallets.remove(wallet_id).is_some())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> RegistryError {
    RegistryError::Storage("wallet store lock poisoned".to_string())
}
