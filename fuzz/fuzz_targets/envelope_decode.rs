//! Fuzz target for wire envelope decoding.
//!
//! Feeds arbitrary bytes through `Envelope::from_json` and re-encodes
//! whatever decodes successfully.
//!
//! # Invariants
//!
//! - Decoding never panics, whatever the input
//! - Anything that decodes also validates (from_json validates)
//! - Decode → encode → decode is a fixed point

#![no_main]

use libfuzzer_sys::fuzz_target;
use sealgram_proto::Envelope;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(envelope) = Envelope::from_json(text) else {
        return;
    };

    // Whatever decoded must survive a re-encode cycle unchanged
    let reencoded = envelope.to_json();
    let redecoded = Envelope::from_json(&reencoded).expect("re-encoded envelope must decode");
    assert_eq!(redecoded, envelope);
});
