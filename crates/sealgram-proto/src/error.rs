//! Wire-layer error types.
//!
//! Two failure classes are kept distinct on purpose: a structurally broken
//! envelope (missing or mistyped field, undecodable base64, wrong field
//! length) and metadata that parses but violates its invariants (empty ids,
//! non-positive timestamp). Callers treat both as terminal for the message.

use thiserror::Error;

/// Errors raised while decoding or validating wire types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Envelope is structurally malformed
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// What failed to parse or validate
        reason: String,
    },

    /// Metadata parsed but violates an invariant
    #[error("invalid metadata: {reason}")]
    InvalidMetadata {
        /// Which invariant was violated
        reason: String,
    },
}
