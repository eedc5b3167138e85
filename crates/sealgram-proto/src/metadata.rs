//! Protected message metadata.
//!
//! Metadata is immutable once bound into an envelope: its canonical byte
//! form is the AEAD associated data, so sender, recipient, chat, timestamp,
//! and sequence are cryptographically inseparable from the payload.

use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// Metadata bound to every envelope
///
/// # Canonical form
///
/// The associated-data bytes are the compact UTF-8 JSON serialization of
/// this struct with keys in exactly this declaration order:
/// `senderId, recipientId, chatId, timestamp, sequence`. Both sides of the
/// wire must reproduce the byte sequence exactly or decryption fails — the
/// field order below is a protocol constant, not a style choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Metadata {
    /// Sending participant id
    pub sender_id: String,
    /// Receiving participant id (exactly one per envelope)
    pub recipient_id: String,
    /// Chat this message belongs to
    pub chat_id: String,
    /// Claimed send time, milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Per-(chat, sender) sequence number
    pub sequence: u64,
}

impl Metadata {
    /// Canonical byte form used as AEAD associated data
    ///
    /// `serde_json` emits struct fields in declaration order with no
    /// whitespace, which is exactly the canonical layout.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let Ok(bytes) = serde_json::to_vec(self) else {
            unreachable!("metadata is plain strings and integers; serialization cannot fail");
        };
        bytes
    }

    /// Check field invariants
    ///
    /// # Errors
    ///
    /// Returns `WireError::InvalidMetadata` if any id field is empty or the
    /// timestamp is not positive. A negative sequence cannot be represented
    /// (`u64`); on the wire it is rejected during deserialization instead.
    pub fn validate(&self) -> Result<(), WireError> {
        if self.sender_id.is_empty() {
            return Err(WireError::InvalidMetadata { reason: "senderId is empty".to_string() });
        }
        if self.recipient_id.is_empty() {
            return Err(WireError::InvalidMetadata { reason: "recipientId is empty".to_string() });
        }
        if self.chat_id.is_empty() {
            return Err(WireError::InvalidMetadata { reason: "chatId is empty".to_string() });
        }
        if self.timestamp <= 0 {
            return Err(WireError::InvalidMetadata {
                reason: format!("timestamp must be positive, got {}", self.timestamp),
            });
        }
        Ok(())
    }
}
