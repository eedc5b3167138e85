//! Hybrid envelope codec.
//!
//! Ties the AEAD engine and the key-wrap engine together into the two
//! protocol operations: plaintext → envelope for a sender, envelope →
//! plaintext for a recipient. The canonical metadata bytes ride as
//! associated data, so every metadata field is as tamper-evident as the
//! message text itself.
//!
//! All functions here are stateless; encrypting one message for N
//! participants is N independent operations with no ordering requirement.

use rand::{CryptoRng, RngCore};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sealgram_crypto::{
    SessionKey, generate_nonce, open, seal, unwrap_session_key, wrap_session_key,
};
use sealgram_proto::{Envelope, Metadata};

use crate::{
    error::ProtocolError,
    freshness::FreshnessPolicy,
    sequence::SequenceTracker,
    store::SequenceStore,
};

// The wire constants and the primitive constants describe the same
// protocol; keep them from drifting apart.
const _: () = assert!(sealgram_proto::IV_LEN == sealgram_crypto::NONCE_SIZE);
const _: () = assert!(sealgram_proto::TAG_LEN == sealgram_crypto::TAG_SIZE);

/// A message recipient: participant id plus published public key
#[derive(Debug, Clone)]
pub struct Participant {
    /// Participant id, becomes `recipientId` in that participant's envelope
    pub id: String,
    /// Published public key to wrap the session key under
    pub public_key: RsaPublicKey,
}

/// Encrypt a message for a single recipient.
///
/// Draws a fresh session key and nonce, seals the plaintext with the
/// canonical metadata bytes as associated data, and wraps the session key
/// under `recipient_public`. Empty plaintext is a valid zero-length
/// message.
///
/// # Errors
///
/// Returns `Wire` if the metadata violates its invariants and `KeyWrap` if
/// the public key is malformed. Never fails on plaintext content.
pub fn encrypt_for_recipient<R: RngCore + CryptoRng>(
    plaintext: &[u8],
    recipient_public: &RsaPublicKey,
    metadata: Metadata,
    rng: &mut R,
) -> Result<Envelope, ProtocolError> {
    metadata.validate()?;

    let session_key = SessionKey::generate(rng);
    let nonce = generate_nonce(rng);

    let sealed = seal(&session_key, &nonce, plaintext, &metadata.canonical_bytes());
    let encrypted_key = wrap_session_key(recipient_public, &session_key, rng)?;

    Ok(Envelope {
        encrypted_key,
        ciphertext: sealed.ciphertext,
        iv: nonce.to_vec(),
        auth_tag: sealed.tag.to_vec(),
        metadata,
    })
}

/// Encrypt one logical message as one envelope per participant.
///
/// The sender should be included in `participants` so it can re-read its
/// own history. Each envelope gets its own session key and nonce; only
/// `recipientId` differs across the metadata.
///
/// # Errors
///
/// Fails on the first participant whose metadata or public key is invalid;
/// no partial result is returned.
pub fn encrypt_for_participants<R: RngCore + CryptoRng>(
    plaintext: &[u8],
    participants: &[Participant],
    sender_id: &str,
    chat_id: &str,
    timestamp_ms: i64,
    sequence: u64,
    rng: &mut R,
) -> Result<Vec<Envelope>, ProtocolError> {
    participants
        .iter()
        .map(|participant| {
            let metadata = Metadata {
                sender_id: sender_id.to_string(),
                recipient_id: participant.id.clone(),
                chat_id: chat_id.to_string(),
                timestamp: timestamp_ms,
                sequence,
            };
            encrypt_for_recipient(plaintext, &participant.public_key, metadata, rng)
        })
        .collect()
}

/// Decrypt an envelope as its addressed recipient.
///
/// # Errors
///
/// Returns `Wire` if the envelope is structurally malformed, `KeyWrap` if
/// the session key cannot be unwrapped (wrong private key, corrupted
/// blob), and `Integrity` if AEAD verification fails for any reason
/// (tampered ciphertext, tag, or metadata). Fails closed: no partial
/// plaintext is ever surfaced.
pub fn decrypt_as_recipient(
    envelope: &Envelope,
    own_private: &RsaPrivateKey,
) -> Result<Vec<u8>, ProtocolError> {
    envelope.validate()?;

    let session_key = unwrap_session_key(own_private, &envelope.encrypted_key)?;

    let mut nonce = [0u8; sealgram_crypto::NONCE_SIZE];
    nonce.copy_from_slice(&envelope.iv);
    let mut tag = [0u8; sealgram_crypto::TAG_SIZE];
    tag.copy_from_slice(&envelope.auth_tag);

    let plaintext = open(
        &session_key,
        &nonce,
        &envelope.ciphertext,
        &tag,
        &envelope.metadata.canonical_bytes(),
    )?;

    Ok(plaintext)
}

/// Full inbound pipeline: freshness, replay protection, then decryption.
///
/// Validation runs before any cryptography so replayed or stale traffic is
/// rejected without paying for an RSA unwrap.
///
/// # Errors
///
/// Any of the validation or decryption errors; all terminal for this
/// envelope.
pub fn receive_envelope<S: SequenceStore>(
    envelope: &Envelope,
    own_private: &RsaPrivateKey,
    tracker: &SequenceTracker<S>,
    policy: &FreshnessPolicy,
    now_ms: i64,
) -> Result<Vec<u8>, ProtocolError> {
    envelope.validate()?;
    policy.check(envelope.metadata.timestamp, now_ms)?;
    tracker.validate_and_register(
        &envelope.metadata.chat_id,
        &envelope.metadata.sender_id,
        envelope.metadata.sequence,
        now_ms,
    )?;

    decrypt_as_recipient(envelope, own_private)
}
