//! In-memory store implementations.
//!
//! Reference implementations backed by `Arc<Mutex<HashMap>>`, used by the
//! test suites and suitable for embedding in a single-process deployment.
//! Clones share state. Poisoned locks are recovered rather than propagated:
//! these stores hold plain data that stays consistent even if a panicking
//! thread abandoned a lock mid-update.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use rsa::RsaPublicKey;
use sealgram_proto::Envelope;

use super::{MessageId, MessageStore, PublicKeyDirectory, SequenceStore, StoreError, Versioned};
use crate::sequence::SequenceRecord;

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// In-memory [`SequenceStore`]
#[derive(Debug, Clone, Default)]
pub struct MemorySequenceStore {
    records: Arc<Mutex<HashMap<(String, String), Versioned<SequenceRecord>>>>,
}

impl MemorySequenceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl SequenceStore for MemorySequenceStore {
    fn load(
        &self,
        chat_id: &str,
        sender_id: &str,
    ) -> Result<Option<Versioned<SequenceRecord>>, StoreError> {
        let records = lock_or_recover(&self.records);
        Ok(records.get(&(chat_id.to_string(), sender_id.to_string())).cloned())
    }

    fn compare_and_swap(
        &self,
        chat_id: &str,
        sender_id: &str,
        expected: Option<u64>,
        record: SequenceRecord,
    ) -> Result<u64, StoreError> {
        let mut records = lock_or_recover(&self.records);
        let key = (chat_id.to_string(), sender_id.to_string());

        let found = records.get(&key).map(|v| v.version);
        if found != expected {
            return Err(StoreError::Conflict {
                key: format!("{chat_id}/{sender_id}"),
                expected,
                found,
            });
        }

        let version = expected.map_or(1, |v| v + 1);
        records.insert(key, Versioned { version, value: record });
        Ok(version)
    }
}

/// In-memory [`MessageStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryMessageStore {
    inner: Arc<Mutex<MessageStoreInner>>,
}

#[derive(Debug, Default)]
struct MessageStoreInner {
    next_id: MessageId,
    envelopes: HashMap<MessageId, Envelope>,
}

impl MemoryMessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored envelopes
    pub fn len(&self) -> usize {
        lock_or_recover(&self.inner).envelopes.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch a single envelope by id
    pub fn get(&self, id: MessageId) -> Option<Envelope> {
        lock_or_recover(&self.inner).envelopes.get(&id).cloned()
    }
}

impl MessageStore for MemoryMessageStore {
    fn put(&self, envelope: Envelope) -> Result<MessageId, StoreError> {
        let mut inner = lock_or_recover(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.envelopes.insert(id, envelope);
        Ok(id)
    }

    fn find_for_recipient(
        &self,
        recipient_id: &str,
    ) -> Result<Vec<(MessageId, Envelope)>, StoreError> {
        let inner = lock_or_recover(&self.inner);
        let mut found: Vec<(MessageId, Envelope)> = inner
            .envelopes
            .iter()
            .filter(|(_, e)| e.metadata.recipient_id == recipient_id)
            .map(|(id, e)| (*id, e.clone()))
            .collect();
        // Deterministic order for tests
        found.sort_by_key(|(id, _)| *id);
        Ok(found)
    }

    fn replace(&self, id: MessageId, envelope: Envelope) -> Result<(), StoreError> {
        let mut inner = lock_or_recover(&self.inner);
        match inner.envelopes.get_mut(&id) {
            Some(slot) => {
                *slot = envelope;
                Ok(())
            },
            None => Err(StoreError::NotFound { key: format!("message {id}") }),
        }
    }
}

/// In-memory [`PublicKeyDirectory`]
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    keys: Arc<Mutex<HashMap<String, RsaPublicKey>>>,
}

impl MemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }
}

impl PublicKeyDirectory for MemoryDirectory {
    fn get(&self, participant_id: &str) -> Result<Option<RsaPublicKey>, StoreError> {
        Ok(lock_or_recover(&self.keys).get(participant_id).cloned())
    }

    fn publish(&self, participant_id: &str, key: &RsaPublicKey) -> Result<(), StoreError> {
        lock_or_recover(&self.keys).insert(participant_id.to_string(), key.clone());
        Ok(())
    }
}
