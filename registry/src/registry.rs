//! Permission-checked wallet mutations.
//!
//! Every mutation validates the threshold invariants before any persistence,
//! bumps `updated_at`, and — when the wallet is active — schedules an
//! on-chain signer-list sync. The registry stays the logical source of
//! truth: a failed sync is reported to the caller and logged, never rolled
//! back into the logical state.

use quorum_crypto::{generate_keypair, verify_signature};
use quorum_ledger::LedgerClient;
use quorum_types::{
    KeyPair, LedgerAddress, PublicKey, Signature, SignerId, Timestamp, UserId, WalletId,
};
use tracing::{info, warn};

use crate::config::{MultiSigWalletConfig, WalletStatus, WALLET_SCHEMA_VERSION};
use crate::error::RegistryError;
use crate::locks::{acquire, WalletLockMap};
use crate::signer::{Signer, SignerPermissions, SignerRole, SignerStatus};
use crate::store::WalletStore;

/// Outcome of the on-chain signer-list sync scheduled by a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncStatus {
    /// Wallet not active; nothing to sync.
    NotScheduled,
    /// On-chain signer list updated.
    Synced,
    /// Sync failed; the logical mutation stands and the failure was logged.
    SyncFailed,
}

/// Result of wallet creation.
///
/// `control_keys` is the wallet's ledger-level control keypair, generated
/// once at creation and used for one-time account activation. It is never
/// persisted by the registry; custody passes to whichever signer holds
/// `can_change_threshold`.
pub struct WalletCreation {
    pub config: MultiSigWalletConfig,
    pub control_keys: KeyPair,
}

/// The challenge bytes a pending signer must sign to prove control of
/// their signing key.
pub fn verification_challenge(wallet_id: &WalletId, signer_id: &SignerId) -> Vec<u8> {
    format!("quorum-signer-proof:{wallet_id}:{signer_id}").into_bytes()
}

fn address_for(public_key: &PublicKey) -> LedgerAddress {
    LedgerAddress::new(format!("qrm_{}", public_key.to_hex()))
}

pub struct MultiSigRegistry<S: WalletStore, L: LedgerClient> {
    store: S,
    ledger: L,
    locks: WalletLockMap,
}

impl<S: WalletStore, L: LedgerClient> MultiSigRegistry<S, L> {
    pub fn new(store: S, ledger: L) -> Self {
        Self {
            store,
            ledger,
            locks: WalletLockMap::new(),
        }
    }

    /// Create an N-of-M wallet.
    ///
    /// Threshold invariants are validated before any persistence. The
    /// creator is auto-inserted as a verified `Owner` signer with full
    /// permissions if not already present in `initial_signers`; other
    /// initial signers start `Pending` and must prove control of their key
    /// via [`Self::verify_signer`] before they count toward thresholds.
    pub fn create_wallet(
        &self,
        owner: UserId,
        owner_key: PublicKey,
        required_signatures: u32,
        total_signers: u32,
        initial_signers: Vec<Signer>,
    ) -> Result<WalletCreation, RegistryError> {
        if total_signers < 2 || required_signatures < 1 || required_signatures > total_signers {
            return Err(RegistryError::InvalidThreshold {
                required: required_signatures,
                total: total_signers,
            });
        }

        let now = Timestamp::now();
        let mut signers = Vec::with_capacity(total_signers as usize);
        let mut owner_present = false;

        for mut signer in initial_signers {
            if signer.user_id == owner {
                owner_present = true;
                signer.role = SignerRole::Owner;
                signer.permissions = SignerPermissions::owner();
                signer.status = SignerStatus::Verified;
                signer.verified_at = Some(now);
            } else if signer.role != SignerRole::Observer {
                // Everyone but the creator proves key control separately.
                signer.status = SignerStatus::Pending;
                signer.verified_at = None;
            }
            signers.push(signer);
        }

        if !owner_present {
            let mut owner_signer = Signer::new(
                owner.clone(),
                owner_key,
                SignerRole::Owner,
                SignerPermissions::owner(),
                now,
            )?;
            owner_signer.status = SignerStatus::Verified;
            owner_signer.verified_at = Some(now);
            signers.insert(0, owner_signer);
        }

        if signers.len() as u32 != total_signers {
            return Err(RegistryError::InvariantViolation(format!(
                "expected {total_signers} signers, got {}",
                signers.len()
            )));
        }

        let control_keys = generate_keypair();
        let ledger_address = address_for(&control_keys.public);

        let mut config = MultiSigWalletConfig {
            wallet_id: WalletId::random(),
            owner_user_id: owner,
            required_signatures,
            signers,
            ledger_address: ledger_address.clone(),
            status: WalletStatus::Pending,
            schema_version: WALLET_SCHEMA_VERSION,
            created_at: now,
            updated_at: now,
        };
        config.check_invariants()?;

        // One-time account activation. A failure leaves the wallet logically
        // created but pending; the chain can catch up later.
        match self.ledger.activate_account(&ledger_address) {
            Ok(()) => config.status = WalletStatus::Active,
            Err(e) => {
                warn!(wallet = %config.wallet_id, error = %e, "ledger account activation failed");
            }
        }

        self.store.put(&config)?;
        info!(
            wallet = %config.wallet_id,
            required = required_signatures,
            total = total_signers,
            "wallet created"
        );

        Ok(WalletCreation {
            config,
            control_keys,
        })
    }

    pub fn get_wallet(
        &self,
        wallet_id: &WalletId,
    ) -> Result<Option<MultiSigWalletConfig>, RegistryError> {
        self.store.get(wallet_id)
    }

    /// Append a signer with `Pending` status. Requires `can_add_signers`.
    pub fn add_signer(
        &self,
        wallet_id: &WalletId,
        requester: &UserId,
        new_signer: Signer,
    ) -> Result<SyncStatus, RegistryError> {
        let lock = self.locks.lock_for(wallet_id);
        let _guard = acquire(&lock);

        let mut config = self.load(wallet_id)?;
        let requester_entry = self.require_member(&config, requester)?;
        if !requester_entry.permissions.can_add_signers {
            return Err(RegistryError::PermissionDenied(format!(
                "{requester} may not add signers"
            )));
        }

        if config.signer_by_user(&new_signer.user_id).is_some() {
            return Err(RegistryError::DuplicateSigner(format!(
                "user {} is already a signer",
                new_signer.user_id
            )));
        }
        if config
            .signers
            .iter()
            .any(|s| s.signing_public_key == new_signer.signing_public_key)
        {
            return Err(RegistryError::DuplicateSigner(
                "signing key already registered".to_string(),
            ));
        }

        let mut new_signer = new_signer;
        if new_signer.role != SignerRole::Observer {
            new_signer.status = SignerStatus::Pending;
            new_signer.verified_at = None;
        }
        let signer_id = new_signer.signer_id.clone();
        config.signers.push(new_signer);
        config.check_invariants()?;

        self.commit(&mut config)?;
        info!(wallet = %wallet_id, signer = %signer_id, "signer added");
        Ok(self.schedule_sync(&config))
    }

    /// Flip a pending signer to `Verified` once they prove control of their
    /// signing key by signing the wallet-scoped challenge.
    pub fn verify_signer(
        &self,
        wallet_id: &WalletId,
        signer_id: &SignerId,
        proof: &Signature,
    ) -> Result<SyncStatus, RegistryError> {
        let lock = self.locks.lock_for(wallet_id);
        let _guard = acquire(&lock);

        let mut config = self.load(wallet_id)?;
        let challenge = verification_challenge(wallet_id, signer_id);

        let signer = config
            .signers
            .iter_mut()
            .find(|s| &s.signer_id == signer_id)
            .ok_or_else(|| RegistryError::SignerNotFound(signer_id.clone()))?;

        if signer.status != SignerStatus::Pending {
            return Err(RegistryError::InvariantViolation(format!(
                "signer {signer_id} is not pending verification"
            )));
        }
        if !verify_signature(&challenge, proof, &signer.signing_public_key) {
            return Err(RegistryError::BadProof);
        }

        signer.status = SignerStatus::Verified;
        signer.verified_at = Some(Timestamp::now());

        self.commit(&mut config)?;
        info!(wallet = %wallet_id, signer = %signer_id, "signer verified");
        Ok(self.schedule_sync(&config))
    }

    /// Remove a signer. Requires `can_remove_signers`; the owner entry can
    /// only be removed by that owner; post-removal invariants are enforced
    /// before anything is persisted.
    pub fn remove_signer(
        &self,
        wallet_id: &WalletId,
        requester: &UserId,
        signer_id: &SignerId,
    ) -> Result<SyncStatus, RegistryError> {
        let lock = self.locks.lock_for(wallet_id);
        let _guard = acquire(&lock);

        let mut config = self.load(wallet_id)?;
        let requester_entry = self.require_member(&config, requester)?;
        if !requester_entry.permissions.can_remove_signers {
            return Err(RegistryError::PermissionDenied(format!(
                "{requester} may not remove signers"
            )));
        }

        let position = config
            .signers
            .iter()
            .position(|s| &s.signer_id == signer_id)
            .ok_or_else(|| RegistryError::SignerNotFound(signer_id.clone()))?;

        let target = &config.signers[position];
        if target.role == SignerRole::Owner && &target.user_id != requester {
            return Err(RegistryError::PermissionDenied(
                "only the owner may remove the owner entry".to_string(),
            ));
        }

        let remaining = config.signers.len() as u32 - 1;
        if remaining < 2 {
            return Err(RegistryError::InvariantViolation(format!(
                "removal would leave {remaining} signer(s), minimum is 2"
            )));
        }
        if config.required_signatures > remaining {
            return Err(RegistryError::InvariantViolation(format!(
                "removal would make threshold {} unachievable with {remaining} signers",
                config.required_signatures
            )));
        }

        config.signers.remove(position);
        config.check_invariants()?;

        self.commit(&mut config)?;
        info!(wallet = %wallet_id, signer = %signer_id, "signer removed");
        Ok(self.schedule_sync(&config))
    }

    /// Change the wallet threshold. Requires `can_change_threshold`.
    pub fn change_threshold(
        &self,
        wallet_id: &WalletId,
        requester: &UserId,
        new_required: u32,
    ) -> Result<SyncStatus, RegistryError> {
        let lock = self.locks.lock_for(wallet_id);
        let _guard = acquire(&lock);

        let mut config = self.load(wallet_id)?;
        let requester_entry = self.require_member(&config, requester)?;
        if !requester_entry.permissions.can_change_threshold {
            return Err(RegistryError::PermissionDenied(format!(
                "{requester} may not change the threshold"
            )));
        }

        if new_required < 1 || new_required > config.total_signers() {
            return Err(RegistryError::InvalidThreshold {
                required: new_required,
                total: config.total_signers(),
            });
        }

        config.required_signatures = new_required;
        config.check_invariants()?;

        self.commit(&mut config)?;
        info!(wallet = %wallet_id, required = new_required, "threshold changed");
        Ok(self.schedule_sync(&config))
    }

    /// Freeze the wallet. Owner only.
    pub fn suspend_wallet(
        &self,
        wallet_id: &WalletId,
        requester: &UserId,
    ) -> Result<(), RegistryError> {
        self.set_status(wallet_id, requester, WalletStatus::Suspended)
    }

    /// Unfreeze the wallet. Owner only.
    pub fn activate_wallet(
        &self,
        wallet_id: &WalletId,
        requester: &UserId,
    ) -> Result<(), RegistryError> {
        self.set_status(wallet_id, requester, WalletStatus::Active)
    }

    fn set_status(
        &self,
        wallet_id: &WalletId,
        requester: &UserId,
        status: WalletStatus,
    ) -> Result<(), RegistryError> {
        let lock = self.locks.lock_for(wallet_id);
        let _guard = acquire(&lock);

        let mut config = self.load(wallet_id)?;
        if requester != &config.owner_user_id {
            return Err(RegistryError::PermissionDenied(
                "only the owner may change wallet status".to_string(),
            ));
        }

        config.status = status;
        self.commit(&mut config)?;
        info!(wallet = %wallet_id, ?status, "wallet status changed");
        Ok(())
    }

    fn load(&self, wallet_id: &WalletId) -> Result<MultiSigWalletConfig, RegistryError> {
        self.store
            .get(wallet_id)?
            .ok_or_else(|| RegistryError::WalletNotFound(wallet_id.clone()))
    }

    fn require_member<'c>(
        &self,
        config: &'c MultiSigWalletConfig,
        user: &UserId,
    ) -> Result<&'c Signer, RegistryError> {
        let signer = config
            .signer_by_user(user)
            .ok_or_else(|| RegistryError::PermissionDenied(format!("{user} is not a signer")))?;
        if signer.status != SignerStatus::Verified {
            return Err(RegistryError::PermissionDenied(format!(
                "{user} is not a verified signer"
            )));
        }
        Ok(signer)
    }

    fn commit(&self, config: &mut MultiSigWalletConfig) -> Result<(), RegistryError> {
        config.updated_at = Timestamp::now();
        self.store.put(config)
    }

    fn schedule_sync(&self, config: &MultiSigWalletConfig) -> SyncStatus {
        if config.status != WalletStatus::Active {
            return SyncStatus::NotScheduled;
        }
        let entries = config.ledger_signer_entries();
        match self
            .ledger
            .update_signer_list(&config.ledger_address, &entries)
        {
            Ok(()) => SyncStatus::Synced,
            Err(e) => {
                warn!(
                    wallet = %config.wallet_id,
                    error = %e,
                    "on-chain signer list sync failed; logical state stands"
                );
                SyncStatus::SyncFailed
            }
        }
    }
}
