//! Participant key pairs.
//!
//! Each participant owns exactly one active RSA key pair. The public half is
//! published through a directory; the private half must never leave the
//! owner's trust boundary. Rotation supersedes a pair rather than mutating
//! it: a new pair is generated and the old one is retained only until the
//! owner's stored messages have been re-wrapped.

use rand::{CryptoRng, RngCore};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::CryptoError;

/// RSA modulus size in bits (2048-bit minimum strength)
pub const KEY_BITS: usize = 2048;

/// A participant's asymmetric key pair
///
/// Intentionally implements neither `Serialize` nor `Display`: the private
/// half is only ever handed to decryption and key-rotation code paths.
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// Public half, safe to publish
    pub public: RsaPublicKey,
    /// Private half, owner-only
    pub private: RsaPrivateKey,
}

impl KeyPair {
    /// Generate a fresh key pair from caller-supplied randomness
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::KeyGeneration` if prime generation fails,
    /// which with a healthy RNG does not happen in practice.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(rng, KEY_BITS)
            .map_err(|e| CryptoError::KeyGeneration { reason: e.to_string() })?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { public, private })
    }
}
