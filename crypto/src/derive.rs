//! Path-addressed deterministic key derivation.
//!
//! Derivation is a pure function of (seed, chain, account index):
//! 1. Render the chain's fixed path template with the account index
//! 2. Initialize the chain code: HMAC-SHA512 keyed by a domain string over the seed
//! 3. Compute HMAC-SHA512 keyed by the running chain code over
//!    `seed ‖ chain_code ‖ path_bytes`
//! 4. Split the 64-byte output: first 32 bytes become key material, last 32
//!    the next chain code
//! 5. Convert the key material into the chain's native keypair representation
//!
//! Only ed25519 chains have a conversion rule here; other chains fail with
//! `UnsupportedChain` rather than producing keys of the wrong curve.

use ed25519_dalek::SigningKey;
use hmac::{Hmac, Mac};
use quorum_types::{Chain, PrivateKey, PublicKey};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

type HmacSha512 = Hmac<Sha512>;

/// Domain separator keying the initial chain code.
const CHAIN_CODE_DOMAIN: &[u8] = b"quorum deterministic wallet v1";

/// A 64-byte BIP39 seed. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretSeed([u8; 64]);

impl SecretSeed {
    pub fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// A 32-byte running chain code. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ChainCode(pub [u8; 32]);

/// One derived keypair, addressed by chain and account index.
///
/// Reproducible from the master seed at any time; never persisted. Secret
/// material (private key, chain code) is zeroized when the value drops.
pub struct DerivedKey {
    pub chain: Chain,
    pub account_index: u32,
    pub path: String,
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
    pub chain_code: ChainCode,
}

/// Derive the keypair for `(chain, account_index)` from a master seed.
///
/// Pure and deterministic: identical inputs yield byte-identical output.
/// Indexes are independent — deriving index 5 does not require index 4.
pub fn derive(
    seed: &SecretSeed,
    chain: Chain,
    account_index: u32,
) -> Result<DerivedKey, CryptoError> {
    if !chain.has_ed25519_keys() {
        return Err(CryptoError::UnsupportedChain(chain));
    }

    let path = chain.derivation_path(account_index);

    // Initial chain code, keyed by the domain separator.
    let mut mac = HmacSha512::new_from_slice(CHAIN_CODE_DOMAIN)
        .map_err(|e| CryptoError::DerivationFailed(e.to_string()))?;
    mac.update(seed.as_bytes());
    let init = mac.finalize().into_bytes();
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&init[32..]);

    // One derivation round keyed by the running chain code.
    let mut mac = HmacSha512::new_from_slice(&chain_code)
        .map_err(|e| CryptoError::DerivationFailed(e.to_string()))?;
    mac.update(seed.as_bytes());
    mac.update(&chain_code);
    mac.update(path.as_bytes());
    let output = mac.finalize().into_bytes();

    let mut key_material = [0u8; 32];
    key_material.copy_from_slice(&output[..32]);
    let mut next_chain_code = [0u8; 32];
    next_chain_code.copy_from_slice(&output[32..]);

    // Chain-native conversion: both supported chains use ed25519 keys.
    let signing_key = SigningKey::from_bytes(&key_material);
    let verifying_key = signing_key.verifying_key();
    key_material.zeroize();
    chain_code.zeroize();

    Ok(DerivedKey {
        chain,
        account_index,
        path,
        public_key: PublicKey(verifying_key.to_bytes()),
        private_key: PrivateKey(signing_key.to_bytes()),
        chain_code: ChainCode(next_chain_code),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic::MasterSecret;
    use proptest::prelude::*;

    fn test_seed() -> SecretSeed {
        let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";
        MasterSecret::from_phrase(phrase).unwrap().to_seed().unwrap()
    }

    #[test]
    fn derivation_is_deterministic() {
        let seed = test_seed();
        let k1 = derive(&seed, Chain::Stellar, 0).unwrap();
        let k2 = derive(&seed, Chain::Stellar, 0).unwrap();
        assert_eq!(k1.public_key, k2.public_key);
        assert_eq!(k1.private_key.0, k2.private_key.0);
        assert_eq!(k1.chain_code.0, k2.chain_code.0);
    }

    #[test]
    fn different_indexes_produce_different_keys() {
        let seed = test_seed();
        let k0 = derive(&seed, Chain::Stellar, 0).unwrap();
        let k1 = derive(&seed, Chain::Stellar, 1).unwrap();
        assert_ne!(k0.public_key, k1.public_key);
    }

    #[test]
    fn different_chains_produce_different_keys() {
        let seed = test_seed();
        let stellar = derive(&seed, Chain::Stellar, 0).unwrap();
        let solana = derive(&seed, Chain::Solana, 0).unwrap();
        assert_ne!(stellar.public_key, solana.public_key);
    }

    #[test]
    fn index_order_is_free() {
        let seed = test_seed();
        let high_first = derive(&seed, Chain::Solana, 9).unwrap();
        let _ = derive(&seed, Chain::Solana, 0).unwrap();
        let high_again = derive(&seed, Chain::Solana, 9).unwrap();
        assert_eq!(high_first.public_key, high_again.public_key);
    }

    #[test]
    fn unsupported_chain_rejected() {
        let seed = test_seed();
        let result = derive(&seed, Chain::Ethereum, 0);
        assert!(matches!(result, Err(CryptoError::UnsupportedChain(_))));
    }

    #[test]
    fn path_is_recorded() {
        let seed = test_seed();
        let key = derive(&seed, Chain::Stellar, 3).unwrap();
        assert_eq!(key.path, "m/44'/148'/3'");
    }

    proptest! {
        #[test]
        fn derive_twice_is_byte_identical(index in 0u32..1000) {
            let seed = test_seed();
            let k1 = derive(&seed, Chain::Solana, index).unwrap();
            let k2 = derive(&seed, Chain::Solana, index).unwrap();
            prop_assert_eq!(k1.public_key.0, k2.public_key.0);
            prop_assert_eq!(k1.private_key.0, k2.private_key.0);
        }
    }
}
