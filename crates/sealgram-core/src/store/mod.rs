//! Store abstractions for the protocol core.
//!
//! Trait-based seams to the external persistence collaborators: sequence
//! records, persisted envelopes, and the public-key directory. The traits
//! are synchronous; whatever I/O an implementation performs is its own
//! concern, and callers apply their own request-level timeouts.
//!
//! All traits require:
//! - `Clone`: can be handed to multiple components
//! - `Send + Sync`: safe for concurrent access
//!
//! # Clone Semantics
//!
//! Implementations typically share internal state via `Arc`, so clones
//! observe the same underlying store. The in-memory implementations here
//! follow that convention.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::{MemoryDirectory, MemoryMessageStore, MemorySequenceStore};
use rsa::RsaPublicKey;
use sealgram_proto::Envelope;

use crate::sequence::SequenceRecord;

/// Identifier assigned by a [`MessageStore`] to a persisted envelope
pub type MessageId = u64;

/// A stored value together with its optimistic-concurrency version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// Version of the record as read; must match on the next swap
    pub version: u64,
    /// The record itself
    pub value: T,
}

/// Durable store for per-(chat, sender) sequence records
///
/// The store must provide an atomic read-modify-write: multiple server
/// instances or multiple devices of one sender may validate concurrently,
/// and exactly one writer per version may win. A uniqueness constraint on
/// (chat, sender) is implied by `compare_and_swap` with `expected = None`:
/// two writers racing to create the same record must not both succeed.
pub trait SequenceStore: Clone + Send + Sync + 'static {
    /// Load the current record and version for a (chat, sender) pair
    ///
    /// Returns `None` if no record exists yet (records are created lazily
    /// on first message).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if underlying storage access fails.
    fn load(
        &self,
        chat_id: &str,
        sender_id: &str,
    ) -> Result<Option<Versioned<SequenceRecord>>, StoreError>;

    /// Atomically replace the record if its version still matches
    ///
    /// `expected = None` asserts the record does not exist yet (creation);
    /// `expected = Some(v)` asserts the current version is exactly `v`.
    /// Returns the new version on success.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if a concurrent writer changed the
    /// record since it was loaded.
    fn compare_and_swap(
        &self,
        chat_id: &str,
        sender_id: &str,
        expected: Option<u64>,
        record: SequenceRecord,
    ) -> Result<u64, StoreError>;
}

/// Durable store for persisted envelopes
pub trait MessageStore: Clone + Send + Sync + 'static {
    /// Persist an envelope, returning its assigned id
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the write fails.
    fn put(&self, envelope: Envelope) -> Result<MessageId, StoreError>;

    /// All stored envelopes addressed to a recipient, with their ids
    ///
    /// This is the set key rotation must re-wrap. Order is unspecified.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the read fails.
    fn find_for_recipient(
        &self,
        recipient_id: &str,
    ) -> Result<Vec<(MessageId, Envelope)>, StoreError>;

    /// Replace a stored envelope in place, keeping its id
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no envelope has this id.
    fn replace(&self, id: MessageId, envelope: Envelope) -> Result<(), StoreError>;
}

/// Directory of published participant public keys
pub trait PublicKeyDirectory: Clone + Send + Sync + 'static {
    /// Currently published public key for a participant, if any
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the lookup fails.
    fn get(&self, participant_id: &str) -> Result<Option<RsaPublicKey>, StoreError>;

    /// Publish (or re-publish) a participant's public key
    ///
    /// This is the rotation release barrier: once it returns, senders may
    /// start encrypting to the new key, so it must only be called after
    /// every outstanding envelope has been re-wrapped.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the write fails.
    fn publish(&self, participant_id: &str, key: &RsaPublicKey) -> Result<(), StoreError>;
}
