//! Session-scoped derived key cache.
//!
//! Derivation is repeatable but not free, so results are cached for the
//! lifetime of an unlocked session. The cache is owned by the unlocked-vault
//! handle and cleared when the vault locks; there is no process-wide cache
//! that could outlive a logical logout.

use std::collections::HashMap;
use std::sync::Arc;

use quorum_types::Chain;

use crate::derive::DerivedKey;

/// Cache of derived keys, keyed by `(chain, account_index)`.
///
/// Entries are `Arc`-shared so callers can hold a key across the cache's
/// lifetime; the underlying secret material zeroizes when the last reference
/// drops.
#[derive(Default)]
pub struct KeyCache {
    entries: HashMap<(Chain, u32), Arc<DerivedKey>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, chain: Chain, account_index: u32) -> Option<Arc<DerivedKey>> {
        self.entries.get(&(chain, account_index)).cloned()
    }

    pub fn insert(&mut self, key: DerivedKey) -> Arc<DerivedKey> {
        let entry = Arc::new(key);
        self.entries
            .insert((entry.chain, entry.account_index), Arc::clone(&entry));
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all cached keys. Secret material zeroizes as entries drop.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
