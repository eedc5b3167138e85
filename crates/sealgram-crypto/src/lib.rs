//! Sealgram Cryptographic Primitives
//!
//! Building blocks for the Sealgram hybrid envelope: RSA-OAEP key wrap and
//! AES-256-GCM authenticated encryption. All functions are stateless and
//! take randomness from the caller, which keeps them parallelizable across
//! messages and deterministic under test.
//!
//! # Hybrid Envelope
//!
//! Each message is encrypted under a fresh single-use session key; only the
//! session key travels under the recipient's long-lived asymmetric key:
//!
//! ```text
//! Session Key (random, 32 bytes)
//!        │
//!        ├──▶ AES-256-GCM ──▶ ciphertext + tag   (metadata bound as AAD)
//!        │
//!        └──▶ RSA-OAEP(recipient public key) ──▶ wrapped key
//! ```
//!
//! # Security
//!
//! Per-message forward secrecy:
//! - Every message uses an independent session key, discarded after use
//! - Compromise of one message's key exposes no other message
//!
//! Authenticity:
//! - AES-GCM binds the ciphertext to caller-supplied associated data
//! - A single flipped bit in ciphertext, tag, or AAD fails verification
//! - Failed verification releases no plaintext
//!
//! Key hygiene:
//! - Session keys are zeroized on drop
//! - Private keys are never serialized by this crate

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aead;
pub mod error;
pub mod keys;
pub mod wrap;

pub use aead::{
    NONCE_SIZE, SESSION_KEY_SIZE, SealedPayload, SessionKey, TAG_SIZE, generate_nonce, open, seal,
};
pub use error::CryptoError;
pub use keys::{KEY_BITS, KeyPair};
pub use wrap::{unwrap_session_key, wrap_session_key};
