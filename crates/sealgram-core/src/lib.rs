//! Sealgram protocol core.
//!
//! Orchestrates the crypto primitives and wire types into the end-to-end
//! messaging protocol: hybrid envelope encryption, per-sender replay
//! protection, timestamp freshness, and key rotation.
//!
//! # Architecture
//!
//! ```text
//! Sender                                    Recipient
//!   │                                          │
//!   ▼                                          ▼
//! SequenceTracker::next_sequence         FreshnessPolicy::check
//!   │                                          │
//!   ▼                                          ▼
//! codec::encrypt_for_participants        SequenceTracker::validate_and_register
//!   │  (one envelope per participant)          │
//!   ▼                                          ▼
//! MessageStore / delivery  ──────────▶   codec::decrypt_as_recipient
//! ```
//!
//! The crypto operations are stateless and freely parallelizable. The one
//! piece of shared mutable state is the per-(chat, sender) sequence record,
//! which the [`SequenceTracker`] serializes through optimistic
//! compare-and-swap against a [`store::SequenceStore`], so multiple devices
//! of the same sender (or multiple server instances) cannot race each other
//! into accepting a replay.
//!
//! Message processing returns a terminal [`ProtocolError`] per message; the
//! core never retries on behalf of the caller, and a tampered message stays
//! distinguishable from one merely addressed to somebody else. Key rotation
//! reports failures through [`RotationError`], which carries the abandoned
//! pair whenever rollback could not fully restore the store.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod error;
pub mod freshness;
pub mod rotation;
pub mod sequence;
pub mod store;

pub use codec::{
    Participant, decrypt_as_recipient, encrypt_for_participants, encrypt_for_recipient,
    receive_envelope,
};
pub use error::ProtocolError;
pub use freshness::{DEFAULT_MAX_AGE_MS, DEFAULT_MAX_SKEW_MS, FreshnessPolicy};
pub use rotation::{RotationError, rotate};
pub use sequence::{
    DEFAULT_ADMISSION_WINDOW, RECENT_WINDOW_CAPACITY, SequenceRecord, SequenceTracker,
    SequenceWindow,
};
pub use store::{
    MemoryDirectory, MemoryMessageStore, MemorySequenceStore, MessageId, MessageStore,
    PublicKeyDirectory, SequenceStore, StoreError, Versioned,
};
