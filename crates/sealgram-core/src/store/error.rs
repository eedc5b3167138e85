//! Store error types.
//!
//! Defines errors that can occur against the durable collaborators:
//! - `NotFound`: requested record doesn't exist
//! - `Conflict`: compare-and-swap lost against a concurrent writer
//! - `Serialization`: failed to encode/decode a persisted record
//! - `Io`: underlying storage system errors

use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Requested record not found
    #[error("record not found: {key}")]
    NotFound {
        /// Key that was looked up
        key: String,
    },

    /// Compare-and-swap version mismatch
    ///
    /// A concurrent writer updated the record between load and swap. The
    /// caller reloads and re-runs its admission logic; for sequence
    /// validation this is idempotent (a sequence the other writer already
    /// registered correctly re-reports as a replay).
    #[error("version conflict on {key}: expected {expected:?}, found {found:?}")]
    Conflict {
        /// Key that was contended
        key: String,
        /// Version the writer expected
        expected: Option<u64>,
        /// Version actually present
        found: Option<u64>,
    },

    /// Serialization or deserialization of a persisted record failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, network)
    #[error("I/O error: {0}")]
    Io(String),
}
