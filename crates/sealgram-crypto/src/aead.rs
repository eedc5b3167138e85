//! Authenticated encryption with associated data.
//!
//! AES-256-GCM with a 12-byte nonce and a 16-byte tag. Ciphertext and tag
//! are kept separate because they travel as separate envelope fields on the
//! wire. The associated data is the canonical metadata serialization, which
//! binds sender, recipient, chat, timestamp, and sequence to the payload:
//! altering any of them after the fact fails verification exactly like
//! altering the message text.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Session key size in bytes (AES-256)
pub const SESSION_KEY_SIZE: usize = 32;

/// Nonce size in bytes (96-bit, the GCM-recommended length)
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// A single-use symmetric session key
///
/// Generated fresh for every message and zeroized on drop. Reusing a
/// session key across messages would forfeit per-message forward secrecy;
/// nothing in this crate ever does so.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_SIZE]);

impl SessionKey {
    /// Generate a random session key from caller-supplied randomness
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; SESSION_KEY_SIZE];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Construct a session key from raw bytes (e.g. after unwrapping)
    pub fn from_bytes(bytes: [u8; SESSION_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material
        f.write_str("SessionKey(..)")
    }
}

/// Ciphertext plus detached authentication tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    /// Encrypted message bytes (same length as the plaintext)
    pub ciphertext: Vec<u8>,
    /// GCM authentication tag over ciphertext and associated data
    pub tag: [u8; TAG_SIZE],
}

/// Generate a random nonce from caller-supplied randomness
///
/// Uniqueness per key is guaranteed statistically: session keys are
/// single-use, so each key sees exactly one nonce.
pub fn generate_nonce<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt `plaintext` under `key` and `nonce`, binding `aad`.
///
/// Empty plaintext is valid and produces an empty ciphertext with a real
/// tag. Never fails on plaintext content.
pub fn seal(
    key: &SessionKey,
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> SealedPayload {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    let Ok(mut sealed) =
        cipher.encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
    else {
        unreachable!("AES-GCM encryption cannot fail with a valid key and nonce");
    };

    // aes-gcm appends the tag; split it off to match the wire layout
    let split_at = sealed.len() - TAG_SIZE;
    let tag_bytes = sealed.split_off(split_at);
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&tag_bytes);

    SealedPayload { ciphertext: sealed, tag }
}

/// Decrypt and verify a sealed payload.
///
/// # Errors
///
/// Returns `CryptoError::Integrity` if the tag does not verify against the
/// ciphertext and `aad` under `key` and `nonce`, for any reason (wrong key,
/// tampered ciphertext, tampered tag, altered associated data). No partial
/// plaintext is ever released.
pub fn open(
    key: &SessionKey,
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    tag: &[u8; TAG_SIZE],
    aad: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: &combined, aad })
        .map_err(|_| CryptoError::Integrity)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn test_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn seal_open_roundtrip() {
        let mut rng = test_rng();
        let key = SessionKey::generate(&mut rng);
        let nonce = generate_nonce(&mut rng);

        let sealed = seal(&key, &nonce, b"hello sealed world", b"aad");
        let opened = open(&key, &nonce, &sealed.ciphertext, &sealed.tag, b"aad").unwrap();

        assert_eq!(opened, b"hello sealed world");
    }

    #[test]
    fn empty_plaintext_roundtrip() {
        let mut rng = test_rng();
        let key = SessionKey::generate(&mut rng);
        let nonce = generate_nonce(&mut rng);

        let sealed = seal(&key, &nonce, b"", b"aad");
        assert!(sealed.ciphertext.is_empty());

        let opened = open(&key, &nonce, &sealed.ciphertext, &sealed.tag, b"aad").unwrap();
        assert!(opened.is_empty());
    }

    #[test]
    fn ciphertext_length_equals_plaintext_length() {
        let mut rng = test_rng();
        let key = SessionKey::generate(&mut rng);
        let nonce = generate_nonce(&mut rng);

        let sealed = seal(&key, &nonce, b"twelve bytes", b"");
        assert_eq!(sealed.ciphertext.len(), 12);
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let mut rng = test_rng();
        let key = SessionKey::generate(&mut rng);
        let nonce = generate_nonce(&mut rng);

        let mut sealed = seal(&key, &nonce, b"original", b"aad");
        sealed.ciphertext[0] ^= 0x01;

        let result = open(&key, &nonce, &sealed.ciphertext, &sealed.tag, b"aad");
        assert_eq!(result, Err(CryptoError::Integrity));
    }

    #[test]
    fn tampered_tag_fails() {
        let mut rng = test_rng();
        let key = SessionKey::generate(&mut rng);
        let nonce = generate_nonce(&mut rng);

        let mut sealed = seal(&key, &nonce, b"original", b"aad");
        sealed.tag[TAG_SIZE - 1] ^= 0x80;

        let result = open(&key, &nonce, &sealed.ciphertext, &sealed.tag, b"aad");
        assert_eq!(result, Err(CryptoError::Integrity));
    }

    #[test]
    fn altered_aad_fails() {
        let mut rng = test_rng();
        let key = SessionKey::generate(&mut rng);
        let nonce = generate_nonce(&mut rng);

        let sealed = seal(&key, &nonce, b"original", b"aad-one");

        let result = open(&key, &nonce, &sealed.ciphertext, &sealed.tag, b"aad-two");
        assert_eq!(result, Err(CryptoError::Integrity));
    }

    #[test]
    fn wrong_key_fails() {
        let mut rng = test_rng();
        let key = SessionKey::generate(&mut rng);
        let other = SessionKey::generate(&mut rng);
        let nonce = generate_nonce(&mut rng);

        let sealed = seal(&key, &nonce, b"secret", b"aad");

        let result = open(&other, &nonce, &sealed.ciphertext, &sealed.tag, b"aad");
        assert_eq!(result, Err(CryptoError::Integrity));
    }

    #[test]
    fn debug_does_not_print_key_material() {
        let mut rng = test_rng();
        let key = SessionKey::generate(&mut rng);

        assert_eq!(format!("{key:?}"), "SessionKey(..)");
    }
}
