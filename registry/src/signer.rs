//! Signer entries, roles, and per-signer permissions.

use quorum_types::{Amount, Asset, PublicKey, SignerId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// What a signer is within a wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignerRole {
    /// The wallet's creator. Cannot be removed by anyone else.
    Owner,
    /// A regular signing member.
    Signer,
    /// Read-only membership. Observers hold no mutating capability and no
    /// entry point accepts their signer id for a mutating call.
    Observer,
}

/// Lifecycle of one signer entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignerStatus {
    /// Added but not yet proven control of the signing key. Does not count
    /// toward any future threshold check.
    Pending,
    /// Proven control; counts toward thresholds.
    Verified,
    /// Revoked membership.
    Revoked,
}

/// Per-signer capability set.
///
/// A closed, explicitly-versioned structure (the wallet record carries the
/// schema version): unknown fields fail deserialization rather than silently
/// defaulting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignerPermissions {
    pub can_sign: bool,
    pub can_add_signers: bool,
    pub can_remove_signers: bool,
    pub can_change_threshold: bool,
    /// Personal per-transaction ceiling, independent of the wallet threshold.
    #[serde(default)]
    pub max_tx_amount: Option<Amount>,
    /// If set, the only assets this signer may initiate transfers of.
    #[serde(default)]
    pub allowed_assets: Option<Vec<Asset>>,
}

impl SignerPermissions {
    /// Full permissions, no ceilings. Granted to wallet owners.
    pub fn owner() -> Self {
        Self {
            can_sign: true,
            can_add_signers: true,
            can_remove_signers: true,
            can_change_threshold: true,
            max_tx_amount: None,
            allowed_assets: None,
        }
    }

    /// Signing only.
    pub fn signer() -> Self {
        Self {
            can_sign: true,
            can_add_signers: false,
            can_remove_signers: false,
            can_change_threshold: false,
            max_tx_amount: None,
            allowed_assets: None,
        }
    }

    /// No capabilities at all. The only permission set an observer may hold.
    pub fn observer() -> Self {
        Self {
            can_sign: false,
            can_add_signers: false,
            can_remove_signers: false,
            can_change_threshold: false,
            max_tx_amount: None,
            allowed_assets: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.can_sign && !self.can_add_signers && !self.can_remove_signers
            && !self.can_change_threshold
    }

    /// Check an amount against the personal ceiling.
    pub fn allows_amount(&self, amount: Amount) -> bool {
        match self.max_tx_amount {
            Some(ceiling) => amount <= ceiling,
            None => true,
        }
    }

    /// Check an asset against the personal allow-list.
    pub fn allows_asset(&self, asset: &Asset) -> bool {
        match &self.allowed_assets {
            Some(allowed) => allowed.contains(asset),
            None => true,
        }
    }
}

/// One signer entry in a wallet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Signer {
    pub signer_id: SignerId,
    pub user_id: UserId,
    pub signing_public_key: PublicKey,
    pub role: SignerRole,
    pub status: SignerStatus,
    pub permissions: SignerPermissions,
    pub added_at: Timestamp,
    #[serde(default)]
    pub verified_at: Option<Timestamp>,
}

impl Signer {
    /// Build a new signer entry, enforcing that observers carry no
    /// capabilities. Observer read-only access is structural, not a runtime
    /// role check scattered across call sites.
    pub fn new(
        user_id: UserId,
        signing_public_key: PublicKey,
        role: SignerRole,
        permissions: SignerPermissions,
        now: Timestamp,
    ) -> Result<Self, RegistryError> {
        if role == SignerRole::Observer && !permissions.is_empty() {
            return Err(RegistryError::InvariantViolation(
                "observers cannot hold mutating permissions".to_string(),
            ));
        }
        Ok(Self {
            signer_id: SignerId::random(),
            user_id,
            signing_public_key,
            role,
            status: SignerStatus::Pending,
            permissions,
            added_at: now,
            verified_at: None,
        })
    }

    /// Whether this signer currently counts toward threshold checks.
    pub fn counts_toward_threshold(&self) -> bool {
        self.status == SignerStatus::Verified && self.permissions.can_sign
    }
}
