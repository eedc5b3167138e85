//! Crypto error types.
//!
//! Failures are deliberately coarse: a failed AEAD verification reports no
//! detail beyond the fact of the failure, so callers cannot leak oracle
//! information about why a ciphertext was rejected.

use thiserror::Error;

/// Errors that can occur in cryptographic operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Asymmetric key pair generation failed
    #[error("key generation failed: {reason}")]
    KeyGeneration {
        /// Underlying RSA error description
        reason: String,
    },

    /// Wrapping or unwrapping a session key failed
    ///
    /// Covers malformed or incompatible public keys on the wrap side and
    /// wrong private keys or corrupted blobs on the unwrap side. RSA-OAEP
    /// does not distinguish these cases, by construction.
    #[error("key wrap failed: {reason}")]
    KeyWrap {
        /// Underlying RSA error description
        reason: String,
    },

    /// AEAD verification failed (tampering or wrong key)
    ///
    /// The ciphertext, authentication tag, or associated data did not
    /// verify. No plaintext was released.
    #[error("integrity violation: authentication failed")]
    Integrity,
}
