//! Fuzz target for sequence admission.
//!
//! Drives the tracker with arbitrary sequence submissions and checks the
//! record invariants hold throughout.
//!
//! # Invariants
//!
//! - Admission never panics on any sequence value, including u64::MAX
//! - An accepted sequence is never accepted a second time
//! - `next_sequence` draws are strictly increasing

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sealgram_core::{MemorySequenceStore, SequenceTracker};

#[derive(Debug, Arbitrary)]
enum Operation {
    Submit(u64),
    Draw,
}

fuzz_target!(|operations: Vec<Operation>| {
    let tracker = SequenceTracker::new(MemorySequenceStore::new());
    let mut accepted = Vec::new();
    let mut last_drawn = 0u64;

    for (step, operation) in operations.iter().enumerate() {
        match operation {
            Operation::Submit(sequence) => {
                if tracker.validate_and_register("c", "s", *sequence, step as i64 + 1).is_ok() {
                    assert!(!accepted.contains(sequence), "sequence accepted twice");
                    accepted.push(*sequence);
                }
            },
            Operation::Draw => {
                if let Ok(drawn) = tracker.next_sequence("c", "s", step as i64 + 1) {
                    assert!(drawn > last_drawn, "draws must be strictly increasing");
                    last_drawn = drawn;
                }
            },
        }
    }
});
