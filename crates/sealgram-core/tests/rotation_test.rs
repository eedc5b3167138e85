//! Key rotation tests.
//!
//! The property under test is all-or-nothing decryptability: a rotation
//! that fails partway must leave every stored envelope decryptable with a
//! key pair the caller still holds — the old pair after a clean rollback,
//! or the returned recovery pair when rollback writes themselves failed.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use rand::SeedableRng;
use rand::rngs::StdRng;
use sealgram_core::{
    MemoryDirectory, MemoryMessageStore, MessageId, MessageStore, ProtocolError,
    PublicKeyDirectory, StoreError, decrypt_as_recipient, encrypt_for_recipient, rotate,
};
use sealgram_crypto::KeyPair;
use sealgram_proto::{Envelope, Metadata};

fn metadata(sequence: u64) -> Metadata {
    Metadata {
        sender_id: "alice".to_string(),
        recipient_id: "bob".to_string(),
        chat_id: "chat-1".to_string(),
        timestamp: 1000 + sequence as i64,
        sequence,
    }
}

/// Bob's pre-rotation world: three messages stored under his current key
fn seed_history(
    rng: &mut StdRng,
) -> (KeyPair, MemoryMessageStore, MemoryDirectory, Vec<Vec<u8>>) {
    let bob = KeyPair::generate(rng).unwrap();
    let messages = MemoryMessageStore::new();
    let directory = MemoryDirectory::new();
    directory.publish("bob", &bob.public).unwrap();

    let plaintexts: Vec<Vec<u8>> =
        vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()];
    for (sequence, plaintext) in plaintexts.iter().enumerate() {
        let envelope =
            encrypt_for_recipient(plaintext, &bob.public, metadata(sequence as u64), rng).unwrap();
        messages.put(envelope).unwrap();
    }

    (bob, messages, directory, plaintexts)
}

fn history_decrypts_with(
    messages: &MemoryMessageStore,
    keys: &KeyPair,
    expected: &[Vec<u8>],
) -> bool {
    let stored = messages.find_for_recipient("bob").unwrap();
    stored.len() == expected.len()
        && stored.iter().zip(expected).all(|((_, envelope), plaintext)| {
            decrypt_as_recipient(envelope, &keys.private).as_deref() == Ok(plaintext.as_slice())
        })
}

#[test]
fn successful_rotation_rewraps_history_and_publishes() {
    let mut rng = StdRng::seed_from_u64(31);
    let (bob, messages, directory, plaintexts) = seed_history(&mut rng);

    let new_keys =
        rotate("bob", std::slice::from_ref(&bob), &messages, &directory, &mut rng).unwrap();

    // History now decrypts with the new key and no longer with the old
    assert!(history_decrypts_with(&messages, &new_keys, &plaintexts));
    for (_, envelope) in messages.find_for_recipient("bob").unwrap() {
        assert!(decrypt_as_recipient(&envelope, &bob.private).is_err());
    }

    // Directory serves the new public key
    assert_eq!(directory.get("bob").unwrap(), Some(new_keys.public.clone()));

    // Metadata survived the re-wrap unchanged
    for (index, (_, envelope)) in messages.find_for_recipient("bob").unwrap().iter().enumerate() {
        assert_eq!(envelope.metadata, metadata(index as u64));
    }
}

#[test]
fn rotation_with_empty_history_just_publishes() {
    let mut rng = StdRng::seed_from_u64(32);
    let bob = KeyPair::generate(&mut rng).unwrap();
    let messages = MemoryMessageStore::new();
    let directory = MemoryDirectory::new();
    directory.publish("bob", &bob.public).unwrap();

    let new_keys =
        rotate("bob", std::slice::from_ref(&bob), &messages, &directory, &mut rng).unwrap();

    assert_eq!(directory.get("bob").unwrap(), Some(new_keys.public));
}

#[test]
fn rotation_without_retained_keys_is_rejected() {
    let mut rng = StdRng::seed_from_u64(33);
    let messages = MemoryMessageStore::new();
    let directory = MemoryDirectory::new();

    let err = rotate("bob", &[], &messages, &directory, &mut rng).unwrap_err();
    assert!(matches!(err.source, ProtocolError::RotationIncomplete { .. }));
    assert!(err.recovery.is_none());
}

#[test]
fn undecryptable_message_aborts_before_any_write() {
    let mut rng = StdRng::seed_from_u64(34);
    let (bob, messages, directory, plaintexts) = seed_history(&mut rng);

    // One stored envelope claims bob as recipient but was wrapped under
    // somebody else's key; bob's private key cannot re-wrap it
    let stranger = KeyPair::generate(&mut rng).unwrap();
    let foreign =
        encrypt_for_recipient(b"not bobs", &stranger.public, metadata(9), &mut rng).unwrap();
    messages.put(foreign).unwrap();

    let err =
        rotate("bob", std::slice::from_ref(&bob), &messages, &directory, &mut rng).unwrap_err();
    assert!(matches!(err.source, ProtocolError::RotationIncomplete { .. }));
    assert!(err.recovery.is_none());

    // Old key still published, old history still decryptable with old key
    assert_eq!(directory.get("bob").unwrap(), Some(bob.public.clone()));
    let stored = messages.find_for_recipient("bob").unwrap();
    let decryptable = stored
        .iter()
        .filter(|(_, e)| decrypt_as_recipient(e, &bob.private).is_ok())
        .count();
    assert_eq!(decryptable, plaintexts.len());
}

/// Message store whose `replace` fails exactly once, on the Nth call
#[derive(Clone)]
struct FailOnceReplaceStore {
    inner: MemoryMessageStore,
    calls: Arc<AtomicUsize>,
    fail_on_call: usize,
}

impl FailOnceReplaceStore {
    fn new(inner: MemoryMessageStore, fail_on_call: usize) -> Self {
        Self { inner, calls: Arc::new(AtomicUsize::new(0)), fail_on_call }
    }
}

impl MessageStore for FailOnceReplaceStore {
    fn put(&self, envelope: Envelope) -> Result<MessageId, StoreError> {
        self.inner.put(envelope)
    }

    fn find_for_recipient(
        &self,
        recipient_id: &str,
    ) -> Result<Vec<(MessageId, Envelope)>, StoreError> {
        self.inner.find_for_recipient(recipient_id)
    }

    fn replace(&self, id: MessageId, envelope: Envelope) -> Result<(), StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call + 1 == self.fail_on_call {
            return Err(StoreError::Io("replace failed (injected)".to_string()));
        }
        self.inner.replace(id, envelope)
    }
}

#[test]
fn write_failure_mid_commit_rolls_back() {
    let mut rng = StdRng::seed_from_u64(35);
    let (bob, messages, directory, plaintexts) = seed_history(&mut rng);

    // First replace succeeds, second fails, rollback replaces succeed
    let failing = FailOnceReplaceStore::new(messages.clone(), 2);

    let err =
        rotate("bob", std::slice::from_ref(&bob), &failing, &directory, &mut rng).unwrap_err();
    assert!(matches!(err.source, ProtocolError::RotationIncomplete { .. }));
    assert!(err.recovery.is_none());

    // Rolled back to the pre-rotation state: old key decrypts everything,
    // old public key still the published one
    assert!(history_decrypts_with(&messages, &bob, &plaintexts));
    assert_eq!(directory.get("bob").unwrap(), Some(bob.public.clone()));
}

/// Directory whose `publish` always fails
#[derive(Clone)]
struct UnpublishableDirectory {
    inner: MemoryDirectory,
}

impl PublicKeyDirectory for UnpublishableDirectory {
    fn get(&self, participant_id: &str) -> Result<Option<rsa::RsaPublicKey>, StoreError> {
        self.inner.get(participant_id)
    }

    fn publish(&self, _participant_id: &str, _key: &rsa::RsaPublicKey) -> Result<(), StoreError> {
        Err(StoreError::Io("directory unavailable (injected)".to_string()))
    }
}

#[test]
fn publish_failure_restores_old_envelopes() {
    let mut rng = StdRng::seed_from_u64(36);
    let (bob, messages, directory, plaintexts) = seed_history(&mut rng);
    let unpublishable = UnpublishableDirectory { inner: directory.clone() };

    let err =
        rotate("bob", std::slice::from_ref(&bob), &messages, &unpublishable, &mut rng).unwrap_err();
    assert!(matches!(err.source, ProtocolError::RotationIncomplete { .. }));
    assert!(err.recovery.is_none());

    // Everything rolled back: old key decrypts the full history
    assert!(history_decrypts_with(&messages, &bob, &plaintexts));
    assert_eq!(directory.get("bob").unwrap(), Some(bob.public.clone()));
}

/// Message store whose `replace` succeeds for a budget of calls, then fails
#[derive(Clone)]
struct ReplaceBudgetStore {
    inner: MemoryMessageStore,
    calls: Arc<AtomicUsize>,
    budget: usize,
}

impl ReplaceBudgetStore {
    fn new(inner: MemoryMessageStore, budget: usize) -> Self {
        Self { inner, calls: Arc::new(AtomicUsize::new(0)), budget }
    }
}

impl MessageStore for ReplaceBudgetStore {
    fn put(&self, envelope: Envelope) -> Result<MessageId, StoreError> {
        self.inner.put(envelope)
    }

    fn find_for_recipient(
        &self,
        recipient_id: &str,
    ) -> Result<Vec<(MessageId, Envelope)>, StoreError> {
        self.inner.find_for_recipient(recipient_id)
    }

    fn replace(&self, id: MessageId, envelope: Envelope) -> Result<(), StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.budget {
            return Err(StoreError::Io("replace failed (injected)".to_string()));
        }
        self.inner.replace(id, envelope)
    }
}

#[test]
fn failed_rollback_returns_recovery_pair_and_retry_completes() {
    let mut rng = StdRng::seed_from_u64(37);
    let (bob, messages, directory, plaintexts) = seed_history(&mut rng);

    // All three commit writes succeed, publish fails, and every rollback
    // write fails too: the store is left holding envelopes wrapped under a
    // key pair the caller never received through the happy path
    let constrained = ReplaceBudgetStore::new(messages.clone(), 3);
    let unpublishable = UnpublishableDirectory { inner: directory.clone() };

    let err = rotate("bob", std::slice::from_ref(&bob), &constrained, &unpublishable, &mut rng)
        .unwrap_err();
    assert!(matches!(err.source, ProtocolError::RotationIncomplete { .. }));

    // The old key alone no longer decrypts the history...
    assert!(!history_decrypts_with(&messages, &bob, &plaintexts));

    // ...but the recovery pair does, so nothing is stranded
    let recovery = err.recovery.expect("failed rollback must return the abandoned pair");
    assert!(history_decrypts_with(&messages, &recovery, &plaintexts));

    // A retry holding both pairs, against a healthy store and directory,
    // completes and re-wraps everything under one final key
    let retained = [bob, recovery];
    let new_keys = rotate("bob", &retained, &messages, &directory, &mut rng).unwrap();
    assert!(history_decrypts_with(&messages, &new_keys, &plaintexts));
    assert_eq!(directory.get("bob").unwrap(), Some(new_keys.public));
}
