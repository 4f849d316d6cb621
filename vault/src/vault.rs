//! The secret vault state machine.
//!
//! `uninitialized → initialized(locked) ⇄ unlocked → uninitialized` (delete,
//! from any state). The unlocked state is an in-memory session holding the
//! master secret, its seed, and the session key cache; `lock()` zeroizes all
//! three. PIN attempts are not rate-limited here — that is an external
//! policy layered above the vault.

use std::sync::Arc;

use quorum_crypto::{derive, DerivedKey, KeyCache, MasterSecret, SecretSeed};
use quorum_types::{Chain, Timestamp, UserId};
use rand::RngCore;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::biometric::BiometricGate;
use crate::error::VaultError;
use crate::record::{self, EncryptedVaultRecord, KdfParams};
use crate::store::VaultStore;

/// Vault tuning knobs. The KDF iteration count is configurable but clamped
/// to at least 1; the defaults cost >100ms on commodity hardware.
#[derive(Clone, Debug, Default)]
pub struct VaultConfig {
    pub kdf: KdfParams,
}

/// Observable vault state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultStatus {
    Uninitialized,
    Locked,
    Unlocked,
}

/// In-memory unlocked state. Dropping it zeroizes the secret, the seed, and
/// every cached derived key.
struct Session {
    secret: MasterSecret,
    seed: SecretSeed,
    cache: KeyCache,
}

/// The encrypted secret vault for one user.
pub struct SecretVault<S: VaultStore, G: BiometricGate> {
    store: S,
    gate: G,
    user: UserId,
    config: VaultConfig,
    session: Option<Session>,
}

impl<S: VaultStore, G: BiometricGate> SecretVault<S, G> {
    pub fn new(store: S, gate: G, user: UserId) -> Self {
        Self::with_config(store, gate, user, VaultConfig::default())
    }

    pub fn with_config(store: S, gate: G, user: UserId, config: VaultConfig) -> Self {
        let mut config = config;
        config.kdf.iterations = config.kdf.iterations.max(1);
        Self {
            store,
            gate,
            user,
            config,
            session: None,
        }
    }

    pub fn status(&self) -> Result<VaultStatus, VaultError> {
        if self.session.is_some() {
            return Ok(VaultStatus::Unlocked);
        }
        Ok(match self.store.get(&self.user)? {
            Some(_) => VaultStatus::Locked,
            None => VaultStatus::Uninitialized,
        })
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_some()
    }

    /// Initialize the vault with a master secret, encrypting it under `pin`.
    ///
    /// Fails with `AlreadyInitialized` if a record exists; an explicit
    /// `delete()` is required first. On success the vault is left unlocked.
    pub fn setup(
        &mut self,
        secret: MasterSecret,
        pin: &str,
        enable_biometric: bool,
    ) -> Result<EncryptedVaultRecord, VaultError> {
        if self.store.get(&self.user)?.is_some() {
            return Err(VaultError::AlreadyInitialized);
        }

        let mut record = record::seal(
            secret.phrase().as_bytes(),
            pin,
            &self.config.kdf,
            Timestamp::now(),
        )?;

        if enable_biometric {
            self.bind_biometric(&mut record, secret.phrase().as_bytes())?;
        }

        self.store.put(&self.user, &record)?;
        self.open_session(secret)?;

        info!(user = %self.user, biometric = enable_biometric, "vault initialized");
        Ok(record)
    }

    /// Attempt to unlock with a PIN.
    ///
    /// `Ok(None)` means authentication failed — expected and frequent, never
    /// an error. A record that decrypts but does not parse as a well-formed
    /// mnemonic is reported as `Corrupted`, distinct from a wrong PIN.
    pub fn unlock_with_pin(&mut self, pin: &str) -> Result<Option<&MasterSecret>, VaultError> {
        let record = self.store.get(&self.user)?.ok_or(VaultError::NotInitialized)?;

        let Some(plaintext) = record::open(&record, pin)? else {
            debug!(user = %self.user, "pin unlock rejected");
            return Ok(None);
        };

        let secret = parse_secret(plaintext)?;
        self.open_session(secret)?;
        debug!(user = %self.user, "vault unlocked with pin");
        Ok(self.session.as_ref().map(|s| &s.secret))
    }

    /// Attempt a biometric unlock.
    ///
    /// Delegates the user-presence check to the platform gate; a refused gate
    /// behaves exactly like a wrong PIN. The gated credential still feeds an
    /// authenticated decryption — the gate alone can never yield the secret.
    pub fn unlock_with_biometric(&mut self) -> Result<Option<&MasterSecret>, VaultError> {
        let record = self.store.get(&self.user)?.ok_or(VaultError::NotInitialized)?;
        if !record.biometric_enabled {
            return Err(VaultError::BiometricNotEnabled);
        }

        if !self.gate.verify_user_presence() {
            debug!(user = %self.user, "biometric unlock rejected");
            return Ok(None);
        }

        let nonce_hex = record
            .biometric_nonce
            .as_deref()
            .ok_or_else(|| VaultError::Corrupted("missing biometric nonce".to_string()))?;
        let ciphertext_hex = record
            .biometric_ciphertext
            .as_deref()
            .ok_or_else(|| VaultError::Corrupted("missing biometric ciphertext".to_string()))?;

        let nonce = hex::decode(nonce_hex)
            .map_err(|e| VaultError::Corrupted(format!("invalid biometric nonce hex: {e}")))?;
        let ciphertext = hex::decode(ciphertext_hex)
            .map_err(|e| VaultError::Corrupted(format!("invalid biometric ciphertext hex: {e}")))?;

        // The credential is key material; wipe it as soon as the decryption
        // attempt is over, whichever way it went.
        let mut credential = self
            .gate
            .load_credential(&self.user)?
            .ok_or_else(|| VaultError::Biometric("no credential registered".to_string()))?;
        let decrypted = record::decrypt_raw(&credential, &nonce, &ciphertext);
        credential.zeroize();

        let Some(plaintext) = decrypted else {
            debug!(user = %self.user, "biometric credential failed authentication");
            return Ok(None);
        };

        let secret = parse_secret(plaintext)?;
        self.open_session(secret)?;
        debug!(user = %self.user, "vault unlocked with biometric");
        Ok(self.session.as_ref().map(|s| &s.secret))
    }

    /// Re-encrypt the secret under a new PIN and fresh salt.
    ///
    /// The old record stays valid until the new one is durably written (the
    /// store's `put` is atomic); any failure leaves the old record intact.
    /// Returns `false` when the old PIN is wrong.
    pub fn change_pin(&mut self, old_pin: &str, new_pin: &str) -> Result<bool, VaultError> {
        let record = self.store.get(&self.user)?.ok_or(VaultError::NotInitialized)?;

        let Some(mut plaintext) = record::open(&record, old_pin)? else {
            return Ok(false);
        };

        let result = record::seal(&plaintext, new_pin, &self.config.kdf, Timestamp::now());
        plaintext.zeroize();
        let mut new_record = result?;

        // The biometric binding is independent of the PIN; carry it over.
        new_record.biometric_enabled = record.biometric_enabled;
        new_record.biometric_nonce = record.biometric_nonce.clone();
        new_record.biometric_ciphertext = record.biometric_ciphertext.clone();

        self.store.put(&self.user, &new_record)?;
        info!(user = %self.user, "vault pin changed");
        Ok(true)
    }

    /// Register a biometric binding on an existing vault. Requires the PIN.
    pub fn enable_biometric(&mut self, pin: &str) -> Result<bool, VaultError> {
        let mut record = self.store.get(&self.user)?.ok_or(VaultError::NotInitialized)?;

        let Some(mut plaintext) = record::open(&record, pin)? else {
            return Ok(false);
        };

        let result = self.bind_biometric(&mut record, &plaintext);
        plaintext.zeroize();
        result?;

        record.last_modified = Timestamp::now();
        self.store.put(&self.user, &record)?;
        info!(user = %self.user, "biometric unlock enabled");
        Ok(true)
    }

    /// Remove the biometric binding and its platform credential.
    pub fn disable_biometric(&mut self) -> Result<(), VaultError> {
        let mut record = self.store.get(&self.user)?.ok_or(VaultError::NotInitialized)?;

        self.gate.remove_credential(&self.user)?;
        record.biometric_enabled = false;
        record.biometric_nonce = None;
        record.biometric_ciphertext = None;
        record.last_modified = Timestamp::now();
        self.store.put(&self.user, &record)?;
        info!(user = %self.user, "biometric unlock disabled");
        Ok(())
    }

    /// Derive (or fetch from the session cache) the key for `(chain, index)`.
    ///
    /// Requires an unlocked session; fails with `Locked` otherwise.
    pub fn derive_key(
        &mut self,
        chain: Chain,
        account_index: u32,
    ) -> Result<Arc<DerivedKey>, VaultError> {
        let session = self.session.as_mut().ok_or(VaultError::Locked)?;

        if let Some(key) = session.cache.get(chain, account_index) {
            return Ok(key);
        }

        let key = derive(&session.seed, chain, account_index)?;
        Ok(session.cache.insert(key))
    }

    /// The unlocked master secret, if any.
    pub fn master_secret(&self) -> Option<&MasterSecret> {
        self.session.as_ref().map(|s| &s.secret)
    }

    /// Zeroize the in-memory secret, seed, and key cache.
    pub fn lock(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.cache.clear();
            debug!(user = %self.user, "vault locked");
        }
    }

    /// Irreversibly erase the persisted record and any biometric binding.
    ///
    /// Destructive and immediate by design; there is no soft delete.
    pub fn delete(&mut self) -> Result<bool, VaultError> {
        self.lock();
        if let Err(e) = self.gate.remove_credential(&self.user) {
            warn!(user = %self.user, error = %e, "failed to remove biometric credential");
        }
        let existed = self.store.delete(&self.user)?;
        if existed {
            info!(user = %self.user, "vault deleted");
        }
        Ok(existed)
    }

    fn open_session(&mut self, secret: MasterSecret) -> Result<(), VaultError> {
        let seed = secret.to_seed()?;
        self.session = Some(Session {
            secret,
            seed,
            cache: KeyCache::new(),
        });
        Ok(())
    }

    fn bind_biometric(
        &self,
        record: &mut EncryptedVaultRecord,
        plaintext: &[u8],
    ) -> Result<(), VaultError> {
        let mut credential = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut credential);

        let mut nonce = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = record::encrypt_raw(&credential, &nonce, plaintext)?;
        self.gate.store_credential(&self.user, &credential)?;
        credential.zeroize();

        record.biometric_enabled = true;
        record.biometric_nonce = Some(hex::encode(nonce));
        record.biometric_ciphertext = Some(hex::encode(ciphertext));
        Ok(())
    }
}

/// Parse decrypted bytes as a well-formed mnemonic, zeroizing the buffer on
/// every path. Malformed output after successful decryption is corruption,
/// not user error.
fn parse_secret(mut plaintext: Vec<u8>) -> Result<MasterSecret, VaultError> {
    let parsed = std::str::from_utf8(&plaintext)
        .map_err(|_| VaultError::Corrupted("decrypted secret is not UTF-8".to_string()))
        .and_then(|phrase| {
            MasterSecret::from_phrase(phrase)
                .map_err(|_| VaultError::Corrupted("decrypted secret is not a valid mnemonic".to_string()))
        });
    plaintext.zeroize();
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biometric::NullBiometricGate;
    use crate::store::MemoryVaultStore;

    fn fast_config() -> VaultConfig {
        VaultConfig {
            kdf: KdfParams {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
            },
        }
    }

    fn new_vault() -> SecretVault<MemoryVaultStore, NullBiometricGate> {
        SecretVault::with_config(
            MemoryVaultStore::new(),
            NullBiometricGate::new(),
            UserId::new("alice"),
            fast_config(),
        )
    }

    fn secret() -> MasterSecret {
        MasterSecret::generate().unwrap()
    }

    #[test]
    fn setup_unlock_roundtrip() {
        let mut vault = new_vault();
        let master = secret();
        let phrase = master.phrase().to_string();

        vault.setup(master, "1234", false).unwrap();
        vault.lock();
        assert_eq!(vault.status().unwrap(), VaultStatus::Locked);

        let unlocked = vault.unlock_with_pin("1234").unwrap().unwrap();
        assert_eq!(unlocked.phrase(), phrase);
        assert_eq!(vault.status().unwrap(), VaultStatus::Unlocked);
    }

    #[test]
    fn wrong_pin_returns_none_not_error() {
        let mut vault = new_vault();
        vault.setup(secret(), "1234", false).unwrap();
        vault.lock();

        assert!(vault.unlock_with_pin("4321").unwrap().is_none());
        assert_eq!(vault.status().unwrap(), VaultStatus::Locked);
    }

    #[test]
    fn setup_twice_rejected() {
        let mut vault = new_vault();
        vault.setup(secret(), "1234", false).unwrap();
        let result = vault.setup(secret(), "5678", false);
        assert!(matches!(result, Err(VaultError::AlreadyInitialized)));
    }

    #[test]
    fn unlock_before_setup_rejected() {
        let mut vault = new_vault();
        assert!(matches!(
            vault.unlock_with_pin("1234"),
            Err(VaultError::NotInitialized)
        ));
    }

    #[test]
    fn corrupted_record_is_distinct_from_wrong_pin() {
        let store = MemoryVaultStore::new();
        let user = UserId::new("alice");
        // A record whose plaintext is decryptable but not a valid mnemonic.
        let bogus = record::seal(
            b"definitely not a mnemonic",
            "1234",
            &fast_config().kdf,
            Timestamp::new(1),
        )
        .unwrap();
        store.put(&user, &bogus).unwrap();

        let mut vault =
            SecretVault::with_config(store, NullBiometricGate::new(), user, fast_config());
        assert!(matches!(
            vault.unlock_with_pin("1234"),
            Err(VaultError::Corrupted(_))
        ));
    }

    #[test]
    fn change_pin_invalidates_old_pin() {
        let mut vault = new_vault();
        let master = secret();
        let phrase = master.phrase().to_string();
        vault.setup(master, "1234", false).unwrap();
        vault.lock();

        assert!(vault.change_pin("1234", "9999").unwrap());
        assert!(vault.unlock_with_pin("1234").unwrap().is_none());
        let unlocked = vault.unlock_with_pin("9999").unwrap().unwrap();
        assert_eq!(unlocked.phrase(), phrase);
    }

    #[test]
    fn change_pin_with_wrong_old_pin_is_noop() {
        let mut vault = new_vault();
        vault.setup(secret(), "1234", false).unwrap();
        vault.lock();

        assert!(!vault.change_pin("0000", "9999").unwrap());
        assert!(vault.unlock_with_pin("1234").unwrap().is_some());
    }

    #[test]
    fn biometric_unlock_roundtrip() {
        let mut vault = new_vault();
        let master = secret();
        let phrase = master.phrase().to_string();
        vault.setup(master, "1234", true).unwrap();
        vault.lock();

        let unlocked = vault.unlock_with_biometric().unwrap().unwrap();
        assert_eq!(unlocked.phrase(), phrase);
    }

    #[test]
    fn refused_gate_behaves_like_wrong_pin() {
        let store = MemoryVaultStore::new();
        let gate = NullBiometricGate::new();
        gate.set_presence(false);
        let mut vault =
            SecretVault::with_config(store, gate, UserId::new("alice"), fast_config());
        vault.setup(secret(), "1234", true).unwrap();
        vault.lock();

        assert!(vault.unlock_with_biometric().unwrap().is_none());
    }

    #[test]
    fn biometric_requires_enabled_record() {
        let mut vault = new_vault();
        vault.setup(secret(), "1234", false).unwrap();
        vault.lock();

        assert!(matches!(
            vault.unlock_with_biometric(),
            Err(VaultError::BiometricNotEnabled)
        ));
    }

    #[test]
    fn enable_then_disable_biometric() {
        let mut vault = new_vault();
        vault.setup(secret(), "1234", false).unwrap();
        vault.lock();

        assert!(vault.enable_biometric("1234").unwrap());
        assert!(vault.unlock_with_biometric().unwrap().is_some());
        vault.lock();

        vault.disable_biometric().unwrap();
        assert!(matches!(
            vault.unlock_with_biometric(),
            Err(VaultError::BiometricNotEnabled)
        ));
    }

    #[test]
    fn derive_key_requires_unlock() {
        let mut vault = new_vault();
        vault.setup(secret(), "1234", false).unwrap();
        vault.lock();

        assert!(matches!(
            vault.derive_key(Chain::Stellar, 0),
            Err(VaultError::Locked)
        ));
    }

    #[test]
    fn derived_keys_are_cached_and_purged_on_lock() {
        let mut vault = new_vault();
        vault.setup(secret(), "1234", false).unwrap();

        let k1 = vault.derive_key(Chain::Stellar, 0).unwrap();
        let k2 = vault.derive_key(Chain::Stellar, 0).unwrap();
        assert!(Arc::ptr_eq(&k1, &k2));

        vault.lock();
        assert!(matches!(
            vault.derive_key(Chain::Stellar, 0),
            Err(VaultError::Locked)
        ));

        // After re-unlock, derivation reproduces identical keys.
        vault.unlock_with_pin("1234").unwrap().unwrap();
        let k3 = vault.derive_key(Chain::Stellar, 0).unwrap();
        assert_eq!(k1.public_key, k3.public_key);
        assert!(!Arc::ptr_eq(&k1, &k3));
    }

    #[test]
    fn delete_erases_everything() {
        let mut vault = new_vault();
        vault.setup(secret(), "1234", true).unwrap();

        assert!(vault.delete().unwrap());
        assert_eq!(vault.status().unwrap(), VaultStatus::Uninitialized);
        assert!(matches!(
            vault.unlock_with_pin("1234"),
            Err(VaultError::NotInitialized)
        ));
        // Deleting again reports nothing existed.
        assert!(!vault.delete().unwrap());
    }

    #[test]
    fn delete_allows_fresh_setup() {
        let mut vault = new_vault();
        vault.setup(secret(), "1234", false).unwrap();
        vault.delete().unwrap();
        vault.setup(secret(), "5678", false).unwrap();
        vault.lock();
        assert!(vault.unlock_with_pin("5678").unwrap().is_some());
    }

    mod roundtrip_properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // The KDF is deliberately slow even at the test floor; keep the
            // case count small.
            #![proptest_config(ProptestConfig::with_cases(8))]

            /// Any generated secret sealed under any printable pin comes back
            /// intact for that pin and stays sealed for every other pin.
            #[test]
            fn seal_unseal_for_all_pins(
                pin in "[ -~]{1,16}",
                other in "[ -~]{1,16}",
            ) {
                prop_assume!(pin != other);

                let mut vault = new_vault();
                let master = secret();
                let phrase = master.phrase().to_string();

                vault.setup(master, &pin, false).unwrap();
                vault.lock();

                prop_assert!(vault.unlock_with_pin(&other).unwrap().is_none());
                let unlocked = vault.unlock_with_pin(&pin).unwrap().unwrap();
                prop_assert_eq!(unlocked.phrase(), phrase.as_str());
            }
        }
    }
}
