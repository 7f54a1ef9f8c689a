//! Fuzz target for FrameDecoder::decode
//!
//! Feeds arbitrary bytes to both framings to find:
//! - Parser crashes or panics
//! - Header reads past the end of short payloads
//! - Length fields that bypass the frame size limit
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use turnstream_proto::{FrameDecoder, FrameMode, SpeakerId, MAX_FRAME_SIZE};

fuzz_target!(|data: &[u8]| {
    let speaker = SpeakerId::from("333");
    for mode in [FrameMode::Text, FrameMode::Legacy] {
        if let Ok(event) = FrameDecoder::new(mode).decode(&speaker, data) {
            assert!(event.seq >= 1, "decoded sequence numbers start at 1");
            assert!(event.text.len() <= MAX_FRAME_SIZE);
            assert!(!event.replace || event.is_final, "replace implies final");
        }
    }
});
