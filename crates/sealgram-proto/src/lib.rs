//! Sealgram wire types.
//!
//! The envelope is the self-contained unit that crosses the wire: a wrapped
//! session key, the AES-GCM ciphertext, nonce and tag, and the protected
//! metadata. Opaque byte fields travel base64-encoded inside a JSON object
//! whose field names are fixed for interoperability.
//!
//! ```text
//! {
//!   "encryptedKey": "<base64>",
//!   "ciphertext":   "<base64>",
//!   "iv":           "<base64>",
//!   "authTag":      "<base64>",
//!   "metadata": { "senderId", "recipientId", "chatId", "timestamp", "sequence" }
//! }
//! ```
//!
//! This crate is pure data: structural validation only, no cryptography.
//! Whether the ciphertext actually verifies against the metadata is decided
//! by the codec in `sealgram-core`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope;
pub mod error;
pub mod metadata;

pub use envelope::{Envelope, IV_LEN, TAG_LEN};
pub use error::WireError;
pub use metadata::Metadata;
