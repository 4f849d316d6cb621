//! The per-wallet threshold configuration record.

use quorum_ledger::SignerEntry;
use quorum_types::{LedgerAddress, SignerId, Timestamp, UserId, WalletId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::RegistryError;
use crate::signer::Signer;

/// Current persisted wallet record schema version.
pub const WALLET_SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletStatus {
    /// Created but not yet activated on the ledger.
    Pending,
    /// Activated; mutations schedule on-chain signer-list syncs.
    Active,
    /// Frozen by the owner; no new transactions should be initiated.
    Suspended,
}

/// The logical source of truth for one N-of-M wallet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultiSigWalletConfig {
    pub wallet_id: WalletId,
    pub owner_user_id: UserId,
    pub required_signatures: u32,
    pub signers: Vec<Signer>,
    pub ledger_address: LedgerAddress,
    pub status: WalletStatus,
    pub schema_version: u32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MultiSigWalletConfig {
    pub fn total_signers(&self) -> u32 {
        self.signers.len() as u32
    }

    pub fn signer_by_id(&self, signer_id: &SignerId) -> Option<&Signer> {
        self.signers.iter().find(|s| &s.signer_id == signer_id)
    }

    pub fn signer_by_user(&self, user_id: &UserId) -> Option<&Signer> {
        self.signers.iter().find(|s| &s.user_id == user_id)
    }

    /// Validate the threshold invariants. Called on every mutation before
    /// anything is persisted.
    pub fn check_invariants(&self) -> Result<(), RegistryError> {
        let total = self.total_signers();
        if total < 2 {
            return Err(RegistryError::InvariantViolation(format!(
                "wallet must keep at least 2 signers, has {total}"
            )));
        }
        if self.required_signatures < 1 || self.required_signatures > total {
            return Err(RegistryError::InvalidThreshold {
                required: self.required_signatures,
                total,
            });
        }

        let mut users = HashSet::new();
        let mut keys = HashSet::new();
        for signer in &self.signers {
            if !users.insert(&signer.user_id) {
                return Err(RegistryError::DuplicateSigner(format!(
                    "user {} appears twice",
                    signer.user_id
                )));
            }
            if !keys.insert(&signer.signing_public_key) {
                return Err(RegistryError::DuplicateSigner(format!(
                    "signing key of user {} appears twice",
                    signer.user_id
                )));
            }
        }

        Ok(())
    }

    /// The on-chain signer list this wallet should converge to: every
    /// verified signer with signing capability, at weight 1.
    pub fn ledger_signer_entries(&self) -> Vec<SignerEntry> {
        self.signers
            .iter()
            .filter(|s| s.counts_toward_threshold())
            .map(|s| SignerEntry {
                public_key: s.signing_public_key.clone(),
                weight: 1,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::{SignerPermissions, SignerRole, SignerStatus};
    use quorum_types::PublicKey;

    fn signer(user: &str, key_byte: u8, role: SignerRole) -> Signer {
        let perms = match role {
            SignerRole::Owner => SignerPermissions::owner(),
            SignerRole::Signer => SignerPermissions::signer(),
            SignerRole::Observer => SignerPermissions::observer(),
        };
        let mut s = Signer::new(
            UserId::new(user),
            PublicKey([key_byte; 32]),
            role,
            perms,
            Timestamp::new(1),
        )
        .unwrap();
        s.status = SignerStatus::Verified;
        s
    }

    fn config(required: u32, signers: Vec<Signer>) -> MultiSigWalletConfig {
        MultiSigWalletConfig {
            wallet_id: WalletId::new("w1"),
            owner_user_id: UserId::new("alice"),
            required_signatures: required,
            signers,
            ledger_address: LedgerAddress::new("qrm_w1"),
            status: WalletStatus::Active,
            schema_version: WALLET_SCHEMA_VERSION,
            created_at: Timestamp::new(1),
            updated_at: Timestamp::new(1),
        }
    }

    #[test]
    fn valid_config_passes() {
        let cfg = config(
            2,
            vec![
                signer("alice", 1, SignerRole::Owner),
                signer("bob", 2, SignerRole::Signer),
                signer("carol", 3, SignerRole::Signer),
            ],
        );
        cfg.check_invariants().unwrap();
        assert_eq!(cfg.total_signers(), 3);
    }

    #[test]
    fn threshold_above_total_rejected() {
        let cfg = config(
            3,
            vec![
                signer("alice", 1, SignerRole::Owner),
                signer("bob", 2, SignerRole::Signer),
            ],
        );
        assert!(matches!(
            cfg.check_invariants(),
            Err(RegistryError::InvalidThreshold {
                required: 3,
                total: 2
            })
        ));
    }

    #[test]
    fn fewer_than_two_signers_rejected() {
        let cfg = config(1, vec![signer("alice", 1, SignerRole::Owner)]);
        assert!(matches!(
            cfg.check_invariants(),
            Err(RegistryError::InvariantViolation(_))
        ));
    }

    #[test]
    fn duplicate_user_rejected() {
        let cfg = config(
            1,
            vec![
                signer("alice", 1, SignerRole::Owner),
                signer("alice", 2, SignerRole::Signer),
            ],
        );
        assert!(matches!(
            cfg.check_invariants(),
            Err(RegistryError::DuplicateSigner(_))
        ));
    }

    #[test]
    fn duplicate_key_rejected() {
        let cfg = config(
            1,
            vec![
                signer("alice", 1, SignerRole::Owner),
                signer("bob", 1, SignerRole::Signer),
            ],
        );
        assert!(matches!(
            cfg.check_invariants(),
            Err(RegistryError::DuplicateSigner(_))
        ));
    }

    #[test]
    fn ledger_entries_exclude_pending_and_observers() {
        let mut pending = signer("dave", 4, SignerRole::Signer);
        pending.status = SignerStatus::Pending;
        let cfg = config(
            2,
            vec![
                signer("alice", 1, SignerRole::Owner),
                signer("bob", 2, SignerRole::Signer),
                signer("eve", 3, SignerRole::Observer),
                pending,
            ],
        );
        let entries = cfg.ledger_signer_entries();
        assert_eq!(entries.len(), 2);
    }
}
