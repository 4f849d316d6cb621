//! BIP39 recovery phrase handling.
//!
//! The master secret is a 24-word mnemonic (256-bit entropy). It exists only
//! in volatile memory while the vault is unlocked and is zeroized on drop.

use bip39::Mnemonic;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::derive::SecretSeed;
use crate::error::CryptoError;

/// A mnemonic-encoded master secret (recovery phrase).
///
/// Intentionally not `Clone`, `Debug`, or `Serialize`. The phrase is zeroized
/// when the value is dropped; callers must not copy it out except to display
/// it once at setup/recovery time.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterSecret {
    phrase: String,
}

impl MasterSecret {
    /// Generate a fresh 24-word mnemonic from 256-bit entropy.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut entropy = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut entropy);
        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| CryptoError::DerivationFailed(e.to_string()))?;
        entropy.zeroize();
        Ok(Self {
            phrase: mnemonic.to_string(),
        })
    }

    /// Construct from a user-supplied phrase, validating the BIP39 checksum.
    pub fn from_phrase(phrase: &str) -> Result<Self, CryptoError> {
        let mnemonic = Mnemonic::parse_normalized(phrase)
            .map_err(|e| CryptoError::InvalidMnemonic(e.to_string()))?;
        Ok(Self {
            phrase: mnemonic.to_string(),
        })
    }

    /// The phrase itself. Display once; never persist.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    /// Derive the 64-byte BIP39 seed (empty passphrase).
    pub fn to_seed(&self) -> Result<SecretSeed, CryptoError> {
        let mnemonic = Mnemonic::parse_normalized(&self.phrase)
            .map_err(|e| CryptoError::InvalidMnemonic(e.to_string()))?;
        Ok(SecretSeed::new(mnemonic.to_seed_normalized("")))
    }
}

/// Validate that a phrase is a well-formed BIP39 mnemonic.
pub fn validate_phrase(phrase: &str) -> bool {
    Mnemonic::parse_normalized(phrase).is_ok()
}
