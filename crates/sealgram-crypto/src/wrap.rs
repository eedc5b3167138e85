//! Session key wrapping (key transport).
//!
//! The per-message session key travels to each recipient wrapped under that
//! recipient's RSA public key with OAEP/SHA-256 padding. One envelope is
//! addressed to exactly one recipient; a message to N participants wraps
//! the same plaintext N independent times, each under a fresh session key.

use rand::{CryptoRng, RngCore};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::{
    aead::{SESSION_KEY_SIZE, SessionKey},
    error::CryptoError,
};

/// Wrap a session key under a recipient's public key.
///
/// # Errors
///
/// Returns `CryptoError::KeyWrap` if the public key is malformed or too
/// small for an OAEP payload of this size.
pub fn wrap_session_key<R: RngCore + CryptoRng>(
    public: &RsaPublicKey,
    key: &SessionKey,
    rng: &mut R,
) -> Result<Vec<u8>, CryptoError> {
    public
        .encrypt(rng, Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|e| CryptoError::KeyWrap { reason: e.to_string() })
}

/// Unwrap a session key with the recipient's own private key.
///
/// # Errors
///
/// Returns `CryptoError::KeyWrap` if OAEP decryption fails (wrong private
/// key, corrupted blob) or the recovered key has the wrong length. OAEP
/// makes the wrong-key and corrupted-blob cases indistinguishable.
pub fn unwrap_session_key(
    private: &RsaPrivateKey,
    wrapped: &[u8],
) -> Result<SessionKey, CryptoError> {
    let recovered = private
        .decrypt(Oaep::new::<Sha256>(), wrapped)
        .map_err(|e| CryptoError::KeyWrap { reason: e.to_string() })?;

    if recovered.len() != SESSION_KEY_SIZE {
        return Err(CryptoError::KeyWrap {
            reason: format!(
                "unwrapped key has length {}, expected {}",
                recovered.len(),
                SESSION_KEY_SIZE
            ),
        });
    }

    let mut bytes = [0u8; SESSION_KEY_SIZE];
    bytes.copy_from_slice(&recovered);
    Ok(SessionKey::from_bytes(bytes))
}
