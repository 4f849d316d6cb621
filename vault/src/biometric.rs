//! Platform biometric gate boundary.
//!
//! The platform (secure enclave, OS keychain) is trusted to hold a random
//! credential and to release it only after a successful user-presence check.
//! The vault never treats the gate as more than that: the credential still
//! feeds an authenticated decryption, so a lying gate cannot conjure the
//! secret out of a record it cannot decrypt.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use quorum_types::UserId;

use crate::error::VaultError;

/// The platform biometric boundary.
pub trait BiometricGate {
    /// Prompt for user presence. `false` is the expected failure mode and is
    /// treated identically to a wrong PIN.
    fn verify_user_presence(&self) -> bool;

    /// Store a biometric-bound credential for a user.
    fn store_credential(&self, user: &UserId, credential: &[u8; 32]) -> Result<(), VaultError>;

    /// Load the credential, if one is registered.
    fn load_credential(&self, user: &UserId) -> Result<Option<[u8; 32]>, VaultError>;

    /// Remove the credential (wallet deletion, biometric disable).
    fn remove_credential(&self, user: &UserId) -> Result<(), VaultError>;
}

/// Deterministic in-memory gate for tests: presence is programmable and
/// credentials live in a map.
pub struct NullBiometricGate {
    present: AtomicBool,
    credentials: Mutex<HashMap<UserId, [u8; 32]>>,
}

impl NullBiometricGate {
    pub fn new() -> Self {
        Self {
            present: AtomicBool::new(true),
            credentials: Mutex::new(HashMap::new()),
        }
    }

    /// Program the next presence checks to succeed or fail.
    pub fn set_presence(&self, present: bool) {
        self.present.store(present, Ordering::SeqCst);
    }

    pub fn has_credential(&self, user: &UserId) -> bool {
        self.credentials
            .lock()
            .map(|c| c.contains_key(user))
            .unwrap_or(false)
    }
}

impl Default for NullBiometricGate {
    fn default() -> Self {
        Self::new()
    }
}

impl BiometricGate for NullBiometricGate {
    fn verify_user_presence(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    fn store_credential(&self, user: &UserId, credential: &[u8; 32]) -> Result<(), VaultError> {
        let mut credentials = self
            .credentials
            .lock()
            .map_err(|_| VaultError::Biometric("credential store poisoned".to_string()))?;
        credentials.insert(user.clone(), *credential);
        Ok(())
    }

    fn load_credential(&self, user: &UserId) -> Result<Option<[u8; 32]>, VaultError> {
        let credentials = self
            .credentials
            .lock()
            .map_err(|_| VaultError::Biometric("credential store poisoned".to_string()))?;
        Ok(credentials.get(user).copied())
    }

    fn remove_credential(&self, user: &UserId) -> Result<(), VaultError> {
        let mut credentials = self
            .credentials
            .lock()
            .map_err(|_| VaultError::Biometric("credential store poisoned".to_string()))?;
        credentials.remove(user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_lifecycle() {
        let gate = NullBiometricGate::new();
        let user = UserId::new("alice");

        assert!(gate.load_credential(&user).unwrap().is_none());
        gate.store_credential(&user, &[7u8; 32]).unwrap();
        assert_eq!(gate.load_credential(&user).unwrap(), Some([7u8; 32]));
        gate.remove_credential(&user).unwrap();
        assert!(gate.load_credential(&user).unwrap().is_none());
    }

    #[test]
    fn presence_is_programmable() {
        let gate = NullBiometricGate::new();
        assert!(gate.verify_user_presence());
        gate.set_presence(false);
        assert!(!gate.verify_user_presence());
    }
}
