//! The wire envelope.
//!
//! A pure data holder for one encrypted message addressed to one recipient.
//! A logical multi-party message is N envelopes, one per participant
//! (including a copy addressed to the sender, so senders can re-read their
//! own history).

use serde::{Deserialize, Serialize};

use crate::{error::WireError, metadata::Metadata};

/// Envelope nonce length in bytes (AES-GCM 96-bit IV)
pub const IV_LEN: usize = 12;

/// Envelope authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// One encrypted message addressed to one recipient
///
/// # Invariants
///
/// - `iv` is exactly [`IV_LEN`] bytes and `auth_tag` exactly [`TAG_LEN`]
///   bytes; [`Envelope::validate`] enforces this and [`Envelope::from_json`]
///   runs it on every decode.
/// - Decrypting with the stated recipient's private key and the bound
///   metadata either yields the exact original plaintext or fails closed.
///   That guarantee lives in the codec; this type only promises structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Envelope {
    /// Session key wrapped under the recipient's public key
    #[serde(with = "base64_bytes")]
    pub encrypted_key: Vec<u8>,
    /// AES-GCM ciphertext (same length as the plaintext)
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    /// AES-GCM nonce, unique per session key
    #[serde(with = "base64_bytes")]
    pub iv: Vec<u8>,
    /// AES-GCM authentication tag
    #[serde(with = "base64_bytes")]
    pub auth_tag: Vec<u8>,
    /// Protected metadata, bound to the ciphertext as associated data
    pub metadata: Metadata,
}

impl Envelope {
    /// Decode an envelope from its JSON wire form
    ///
    /// # Errors
    ///
    /// Returns `WireError::MalformedEnvelope` for syntactically broken
    /// JSON, missing or mistyped fields, undecodable base64, or wrong
    /// `iv`/`authTag` lengths, and `WireError::InvalidMetadata` if the
    /// metadata violates its invariants.
    pub fn from_json(json: &str) -> Result<Self, WireError> {
        let envelope: Self = serde_json::from_str(json)
            .map_err(|e| WireError::MalformedEnvelope { reason: e.to_string() })?;
        envelope.validate()?;
        Ok(envelope)
    }

    /// Encode the envelope to its JSON wire form
    pub fn to_json(&self) -> String {
        let Ok(json) = serde_json::to_string(self) else {
            unreachable!("envelope is plain bytes and strings; serialization cannot fail");
        };
        json
    }

    /// Check structural invariants
    ///
    /// # Errors
    ///
    /// Returns `WireError::MalformedEnvelope` on wrong field lengths and
    /// `WireError::InvalidMetadata` if the metadata is invalid.
    pub fn validate(&self) -> Result<(), WireError> {
        if self.encrypted_key.is_empty() {
            return Err(WireError::MalformedEnvelope {
                reason: "encryptedKey is empty".to_string(),
            });
        }
        if self.iv.len() != IV_LEN {
            return Err(WireError::MalformedEnvelope {
                reason: format!("iv has length {}, expected {IV_LEN}", self.iv.len()),
            });
        }
        if self.auth_tag.len() != TAG_LEN {
            return Err(WireError::MalformedEnvelope {
                reason: format!("authTag has length {}, expected {TAG_LEN}", self.auth_tag.len()),
            });
        }
        self.metadata.validate()
    }
}

/// Base64 (standard alphabet) serde adapter for opaque byte fields
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64.decode(encoded).map_err(serde::de::Error::custom)
    }
}
