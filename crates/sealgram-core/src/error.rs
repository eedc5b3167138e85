//! Protocol error taxonomy.
//!
//! Every variant is terminal for the specific message or operation; the
//! core retries nothing on its own. The distinctions are load-bearing:
//! "not for me" (`KeyWrap`, expected when an envelope reaches the wrong
//! device) must stay observable apart from "tampered" (`Integrity`, a
//! security event), and rotation failures must be recognizable as
//! non-destructive aborts.

use sealgram_crypto::CryptoError;
use sealgram_proto::WireError;
use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while processing a message or rotating keys
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Envelope or metadata failed structural validation
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Session key wrap or unwrap failed (malformed or wrong key)
    #[error("key wrap failed: {reason}")]
    KeyWrap {
        /// Underlying failure description
        reason: String,
    },

    /// AEAD verification failed — tampering or wrong key
    #[error("integrity violation: authentication failed")]
    Integrity,

    /// Message is older than the freshness window allows
    #[error("message expired: age {age_ms}ms exceeds max {max_age_ms}ms")]
    Expired {
        /// How old the message claims to be
        age_ms: i64,
        /// Configured maximum age
        max_age_ms: i64,
    },

    /// Message claims to originate in the future beyond clock-skew tolerance
    #[error("invalid timestamp: {skew_ms}ms in the future exceeds max skew {max_skew_ms}ms")]
    FromFuture {
        /// How far in the future the timestamp lies
        skew_ms: i64,
        /// Configured maximum tolerated skew
        max_skew_ms: i64,
    },

    /// Duplicate or stale sequence number (replay)
    #[error("replay detected: sequence {sequence} against last accepted {last_sequence}")]
    Replay {
        /// The rejected sequence number
        sequence: u64,
        /// Highest sequence accepted so far for this (chat, sender)
        last_sequence: u64,
    },

    /// Sequence number too far ahead to be legitimate reordering
    #[error("invalid sequence: {sequence} is beyond last accepted {last_sequence} + window")]
    SequenceTooFarAhead {
        /// The rejected sequence number
        sequence: u64,
        /// Highest sequence accepted so far for this (chat, sender)
        last_sequence: u64,
    },

    /// Optimistic-concurrency retry budget exhausted
    ///
    /// The sequence record stayed consistent; this submission was simply
    /// never admitted. Safe to retry.
    #[error("sequence record {chat_id}/{sender_id} contended beyond {attempts} attempts")]
    Contended {
        /// Chat whose record was contended
        chat_id: String,
        /// Sender whose record was contended
        sender_id: String,
        /// Attempts made before giving up
        attempts: usize,
    },

    /// Key rotation aborted before any destructive step
    ///
    /// The old key pair is still valid and still retained; no message has
    /// become undecryptable. Safe to retry the whole rotation.
    #[error("rotation incomplete: {reason}")]
    RotationIncomplete {
        /// What failed partway
        reason: String,
    },

    /// Durable store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CryptoError> for ProtocolError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::KeyWrap { reason } => ProtocolError::KeyWrap { reason },
            CryptoError::Integrity => ProtocolError::Integrity,
            // Key generation only happens inside rotation
            CryptoError::KeyGeneration { reason } => ProtocolError::RotationIncomplete { reason },
        }
    }
}
