//! Key rotation coordinator.
//!
//! Swaps a participant's key pair and re-wraps their stored message history
//! under the new public key. The ordering is the load-bearing part:
//!
//! 1. generate the new pair
//! 2. decrypt + re-encrypt every stored envelope addressed to the
//!    participant, staged in memory
//! 3. write the replacements to the message store
//! 4. publish the new public key — the release barrier; only now may
//!    senders start encrypting to the new key
//! 5. return the new pair — only now may the caller discard the old
//!    private key
//!
//! Publishing before the history is re-wrapped would open a window where
//! senders encrypt to the new key while stored history still needs the
//! old, about-to-be-discarded one. Any failure before step 4 rolls back
//! and aborts, leaving the pre-rotation state fully functional: old key
//! published, old key retained, every message still decryptable.
//!
//! Rollback writes can themselves fail. When that happens the store may
//! still hold envelopes wrapped under the new public key, so the error
//! carries the new pair in [`RotationError::recovery`]; the caller retains
//! it alongside the old pair and passes both to the retry, which decrypts
//! each envelope with whichever retained pair fits. No envelope is ever
//! stranded under a discarded key.

use rand::{CryptoRng, RngCore};
use sealgram_crypto::KeyPair;
use sealgram_proto::Envelope;
use thiserror::Error;

use crate::{
    codec,
    error::ProtocolError,
    store::{MessageId, MessageStore, PublicKeyDirectory},
};

/// A failed rotation, plus whatever the caller must keep to stay safe
#[derive(Debug, Error)]
#[error("{source}")]
pub struct RotationError {
    /// What failed; always `ProtocolError::RotationIncomplete`
    pub source: ProtocolError,

    /// Abandoned pair that may still wrap stored envelopes
    ///
    /// `Some` only when rollback could not fully restore the store. The
    /// caller must retain this pair alongside the old one and pass both to
    /// the retry; discarding it would leave the affected envelopes
    /// undecryptable.
    pub recovery: Option<KeyPair>,
}

/// Rotate a participant's key pair, re-wrapping their stored history.
///
/// `retained_keys` holds every pair the caller still owns: exactly one on
/// a first attempt, the old pair plus the previous error's
/// [`RotationError::recovery`] pair on a retry. Each stored envelope is
/// decrypted with the first retained pair that fits.
///
/// On success the new pair is returned and the new public key is
/// published; the caller must then discard every retained pair. On error
/// the caller keeps all retained pairs, plus the `recovery` pair if the
/// error carries one.
///
/// # Errors
///
/// Returns a [`RotationError`] naming the failed step.
pub fn rotate<M, D, R>(
    participant_id: &str,
    retained_keys: &[KeyPair],
    messages: &M,
    directory: &D,
    rng: &mut R,
) -> Result<KeyPair, RotationError>
where
    M: MessageStore,
    D: PublicKeyDirectory,
    R: RngCore + CryptoRng,
{
    if retained_keys.is_empty() {
        return Err(aborted(incomplete(
            "selecting retained keys",
            &"at least one retained key pair is required",
        )));
    }

    let new_keys = KeyPair::generate(rng)
        .map_err(|e| aborted(incomplete("key generation", &e)))?;

    let outstanding = messages
        .find_for_recipient(participant_id)
        .map_err(|e| aborted(incomplete("loading outstanding messages", &e)))?;

    tracing::debug!(
        participant_id,
        messages = outstanding.len(),
        "re-wrapping message history under new key"
    );

    // Stage every replacement before touching the store
    let mut staged: Vec<(MessageId, Envelope, Envelope)> = Vec::with_capacity(outstanding.len());
    for (id, envelope) in outstanding {
        let plaintext = decrypt_with_any(&envelope, retained_keys)
            .map_err(|e| aborted(incomplete(&format!("re-wrapping message {id}"), &e)))?;
        let rewrapped = codec::encrypt_for_recipient(
            &plaintext,
            &new_keys.public,
            envelope.metadata.clone(),
            rng,
        )
        .map_err(|e| aborted(incomplete(&format!("re-wrapping message {id}"), &e)))?;
        staged.push((id, envelope, rewrapped));
    }

    // Commit replacements; on failure restore everything already written
    for (index, (id, _, rewrapped)) in staged.iter().enumerate() {
        if let Err(e) = messages.replace(*id, rewrapped.clone()) {
            let source = incomplete(&format!("storing re-wrapped message {id}"), &e);
            return Err(roll_back(messages, &staged[..index], source, &new_keys));
        }
    }

    // Release barrier: history is consistent under the new key
    if let Err(e) = directory.publish(participant_id, &new_keys.public) {
        let source = incomplete("publishing new public key", &e);
        return Err(roll_back(messages, &staged, source, &new_keys));
    }

    tracing::info!(participant_id, rewrapped = staged.len(), "key rotation complete");
    Ok(new_keys)
}

/// Decrypt with the first retained pair that fits
fn decrypt_with_any(
    envelope: &Envelope,
    retained_keys: &[KeyPair],
) -> Result<Vec<u8>, ProtocolError> {
    let mut last_error =
        ProtocolError::KeyWrap { reason: "no retained key pair fits".to_string() };
    for keys in retained_keys {
        match codec::decrypt_as_recipient(envelope, &keys.private) {
            Ok(plaintext) => return Ok(plaintext),
            Err(e) => last_error = e,
        }
    }
    Err(last_error)
}

/// Restore originals for every envelope already written.
///
/// If a restore write fails, the store may still hold envelopes wrapped
/// under `new_keys`, so that pair rides along in the returned error for
/// the caller to retain.
fn roll_back<M: MessageStore>(
    messages: &M,
    written: &[(MessageId, Envelope, Envelope)],
    source: ProtocolError,
    new_keys: &KeyPair,
) -> RotationError {
    let mut fully_restored = true;
    for (id, original, _) in written {
        if let Err(e) = messages.replace(*id, original.clone()) {
            fully_restored = false;
            tracing::error!(id, error = %e, "failed to restore original envelope");
        }
    }

    RotationError { source, recovery: (!fully_restored).then(|| new_keys.clone()) }
}

fn aborted(source: ProtocolError) -> RotationError {
    RotationError { source, recovery: None }
}

fn incomplete(step: &str, err: &dyn std::fmt::Display) -> ProtocolError {
    tracing::error!(step, error = %err, "key rotation aborted");
    ProtocolError::RotationIncomplete { reason: format!("{step}: {err}") }
}
