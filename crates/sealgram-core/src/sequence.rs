//! Per-sender sequence tracking (replay and reorder protection).
//!
//! One [`SequenceRecord`] exists per (chat, sender) pair, created lazily on
//! the first message. Admission is a sliding-window duplicate filter, not a
//! strict total order: small reordering within the admission window
//! survives out-of-order network delivery, while duplicates, stale values,
//! and wildly-out-of-range values are rejected.
//!
//! # Concurrency
//!
//! Multiple devices of one sender (or multiple server instances) may
//! validate concurrently. The tracker therefore never mutates in place: it
//! loads a versioned record, runs admission, and writes back through
//! [`SequenceStore::compare_and_swap`]. A lost race reloads and re-runs
//! admission, which is idempotent — a sequence number the winning writer
//! already registered correctly re-reports as a replay.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{
    error::ProtocolError,
    store::{SequenceStore, StoreError},
};

/// Tolerance band around the last accepted sequence number
pub const DEFAULT_ADMISSION_WINDOW: u64 = 10;

/// Capacity of the recently-accepted set (oldest evicted first)
pub const RECENT_WINDOW_CAPACITY: usize = 50;

/// Attempts before a compare-and-swap loop gives up under contention
const CAS_MAX_ATTEMPTS: usize = 64;

/// Fixed-capacity set of recently accepted sequence numbers
///
/// Membership checks go through a `BTreeSet`; eviction order through an
/// insertion-order queue. On the wire and in storage it is just the plain
/// list of entries in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<u64>", into = "Vec<u64>")]
pub struct SequenceWindow {
    order: VecDeque<u64>,
    index: BTreeSet<u64>,
}

impl SequenceWindow {
    /// Create an empty window
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `sequence` was recently accepted
    pub fn contains(&self, sequence: u64) -> bool {
        self.index.contains(&sequence)
    }

    /// Record an accepted sequence number, evicting the oldest entry when
    /// capacity is exceeded
    pub fn insert(&mut self, sequence: u64) {
        if !self.index.insert(sequence) {
            return;
        }
        self.order.push_back(sequence);

        if self.order.len() > RECENT_WINDOW_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.index.remove(&oldest);
            }
        }
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the window holds no entries
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl From<Vec<u64>> for SequenceWindow {
    fn from(entries: Vec<u64>) -> Self {
        let mut window = Self::new();
        for entry in entries {
            window.insert(entry);
        }
        window
    }
}

impl From<SequenceWindow> for Vec<u64> {
    fn from(window: SequenceWindow) -> Self {
        window.order.into_iter().collect()
    }
}

/// Persisted sequence state for one (chat, sender) pair
///
/// # Invariants
///
/// - `last_sequence` is monotonically non-decreasing
/// - `window.len() <= RECENT_WINDOW_CAPACITY`
/// - Mutated only through the tracker's validate-and-register path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceRecord {
    /// Highest sequence number accepted so far
    pub last_sequence: u64,
    /// Recently accepted sequence numbers
    #[serde(rename = "recentWindow")]
    pub window: SequenceWindow,
    /// When this record was last touched, ms since epoch
    #[serde(rename = "lastUpdate")]
    pub last_update_ms: i64,
}

impl SequenceRecord {
    /// Fresh zeroed record (no message accepted yet)
    pub fn new(now_ms: i64) -> Self {
        Self { last_sequence: 0, window: SequenceWindow::new(), last_update_ms: now_ms }
    }
}

/// Validates and registers sequence numbers atomically per (chat, sender)
#[derive(Debug, Clone)]
pub struct SequenceTracker<S: SequenceStore> {
    store: S,
    admission_window: u64,
}

impl<S: SequenceStore> SequenceTracker<S> {
    /// Tracker with the default admission window
    pub fn new(store: S) -> Self {
        Self::with_window(store, DEFAULT_ADMISSION_WINDOW)
    }

    /// Tracker with an explicit admission window
    pub fn with_window(store: S, admission_window: u64) -> Self {
        Self { store, admission_window }
    }

    /// Validate an incoming sequence number and register it if admitted
    ///
    /// Admission policy, in order:
    /// 1. duplicate of a recently accepted number → replay
    /// 2. more than `window` behind `last_sequence` → replay
    /// 3. more than `window` ahead of `last_sequence` → invalid sequence
    /// 4. otherwise accept; `last_sequence` never moves backward
    ///
    /// # Errors
    ///
    /// Returns `Replay`, `SequenceTooFarAhead`, `Contended` if the retry
    /// budget runs out, or a `Store` error if the record could not be
    /// persisted.
    pub fn validate_and_register(
        &self,
        chat_id: &str,
        sender_id: &str,
        sequence: u64,
        now_ms: i64,
    ) -> Result<(), ProtocolError> {
        for _ in 0..CAS_MAX_ATTEMPTS {
            let loaded = self.store.load(chat_id, sender_id)?;
            let (expected, mut record) = match loaded {
                Some(versioned) => (Some(versioned.version), versioned.value),
                None => {
                    tracing::debug!(chat_id, sender_id, "creating sequence record");
                    (None, SequenceRecord::new(now_ms))
                },
            };

            if let Err(rejection) = admit(&record, sequence, self.admission_window) {
                tracing::warn!(
                    chat_id,
                    sender_id,
                    sequence,
                    last_sequence = record.last_sequence,
                    error = %rejection,
                    "rejected sequence number"
                );
                return Err(rejection);
            }

            record.window.insert(sequence);
            record.last_sequence = record.last_sequence.max(sequence);
            record.last_update_ms = now_ms;

            match self.store.compare_and_swap(chat_id, sender_id, expected, record) {
                Ok(_) => return Ok(()),
                Err(StoreError::Conflict { .. }) => {
                    // Lost the race; reload and re-admit
                    continue;
                },
                Err(other) => return Err(other.into()),
            }
        }

        Err(self.gave_up(chat_id, sender_id))
    }

    /// Atomically draw the next outgoing sequence number for a sender
    ///
    /// Serialized against `validate_and_register` (and against other
    /// devices of the same sender) through the same compare-and-swap, so
    /// two concurrent sends cannot draw the same number.
    ///
    /// # Errors
    ///
    /// Returns `Contended` if the retry budget runs out, or a `Store`
    /// error if the record could not be persisted.
    pub fn next_sequence(
        &self,
        chat_id: &str,
        sender_id: &str,
        now_ms: i64,
    ) -> Result<u64, ProtocolError> {
        for _ in 0..CAS_MAX_ATTEMPTS {
            let loaded = self.store.load(chat_id, sender_id)?;
            let (expected, mut record) = match loaded {
                Some(versioned) => (Some(versioned.version), versioned.value),
                None => (None, SequenceRecord::new(now_ms)),
            };

            let next = record.last_sequence + 1;
            record.last_sequence = next;
            record.last_update_ms = now_ms;

            match self.store.compare_and_swap(chat_id, sender_id, expected, record) {
                Ok(_) => return Ok(next),
                Err(StoreError::Conflict { .. }) => continue,
                Err(other) => return Err(other.into()),
            }
        }

        Err(self.gave_up(chat_id, sender_id))
    }

    fn gave_up(&self, chat_id: &str, sender_id: &str) -> ProtocolError {
        tracing::warn!(
            chat_id,
            sender_id,
            attempts = CAS_MAX_ATTEMPTS,
            "gave up on contended sequence record"
        );
        ProtocolError::Contended {
            chat_id: chat_id.to_string(),
            sender_id: sender_id.to_string(),
            attempts: CAS_MAX_ATTEMPTS,
        }
    }
}

/// Pure admission decision against a record snapshot
fn admit(record: &SequenceRecord, sequence: u64, window: u64) -> Result<(), ProtocolError> {
    if record.window.contains(sequence) {
        return Err(ProtocolError::Replay { sequence, last_sequence: record.last_sequence });
    }

    // sequence < last_sequence - window, written overflow-safe
    if sequence.saturating_add(window) < record.last_sequence {
        return Err(ProtocolError::Replay { sequence, last_sequence: record.last_sequence });
    }

    if sequence > record.last_sequence.saturating_add(window) {
        return Err(ProtocolError::SequenceTooFarAhead {
            sequence,
            last_sequence: record.last_sequence,
        });
    }

    Ok(())
}
