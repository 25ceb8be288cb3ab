//! Fuzz target for the connection authentication/dispatch state machine
//!
//! Ensure `Connection` never panics and never leaves `Closed` once entered,
//! regardless of the sequence or content of packets thrown at it.
//!
//! # Strategy
//!
//! - An arbitrary sequence of synthetic packets (type code + body bytes),
//!   optionally with a configured credential, driven through one
//!   `Connection` instance in order.
//!
//! # Invariants
//!
//! - `handle_packet` never panics.
//! - Once `Connection::state()` reports `Closed`, it never reports
//!   anything else for the remainder of the sequence.
//! - `commands_executed` never decreases.

#![no_main]

use std::time::{Duration, Instant};

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use rcon_core::{Connection, ConnectionState, CredentialRecord};
use rcon_protocol::Packet;

#[derive(Debug, Clone, Arbitrary)]
struct FuzzPacket {
    type_code: TypeCodeChoice,
    request_id: i32,
    body: Vec<u8>,
}

#[derive(Debug, Clone, Arbitrary)]
enum TypeCodeChoice {
    Auth,
    ExecOrAuthResponse,
    ResponseValue,
    Other(i32),
}

fuzz_target!(|input: (bool, Vec<FuzzPacket>)| {
    let (use_credential, packets) = input;
    let credential = use_credential.then(|| CredentialRecord::hash("fuzz-password"));

    let t0 = Instant::now();
    let mut conn: Connection<Instant> = Connection::new(t0);
    let mut last_commands_executed = 0u64;
    let mut saw_closed = false;

    for (i, fuzzed) in packets.into_iter().enumerate() {
        let type_code = match fuzzed.type_code {
            TypeCodeChoice::Auth => rcon_protocol::TYPE_AUTH,
            TypeCodeChoice::ExecOrAuthResponse => rcon_protocol::TYPE_EXEC_OR_AUTH_RESPONSE,
            TypeCodeChoice::ResponseValue => rcon_protocol::TYPE_RESPONSE_VALUE,
            TypeCodeChoice::Other(code) => code,
        };

        // Only valid UTF-8 bodies can occur on the wire (the codec rejects
        // anything else before it ever reaches the state machine).
        let Ok(body_str) = std::str::from_utf8(&fuzzed.body) else { continue };
        let packet = Packet::new(fuzzed.request_id, type_code, Bytes::copy_from_slice(body_str.as_bytes()));

        let now = t0 + Duration::from_millis(i as u64);
        let _ = conn.handle_packet(&packet, credential.as_ref(), now);

        if saw_closed {
            assert_eq!(conn.state(), ConnectionState::Closed, "Closed must be terminal");
        }
        saw_closed = conn.state() == ConnectionState::Closed;

        assert!(conn.commands_executed() >= last_commands_executed);
        last_commands_executed = conn.commands_executed();
    }
});
