//! Property-based tests for packet encoding/decoding.
//!
//! These verify that the wire codec is correct for ALL valid inputs, not
//! just the boundary examples covered in `packet.rs`'s unit tests.

#![allow(clippy::unwrap_used)]

use bytes::Bytes;
use proptest::prelude::*;
use rcon_protocol::{DecodeOutcome, Packet, TYPE_AUTH, TYPE_EXEC_OR_AUTH_RESPONSE, try_decode_one};

const MAX_FRAME_SIZE: i32 = 4096;
/// Largest body that fits at `MAX_FRAME_SIZE` (size field max is
/// `max_frame_size - 4`, of which 10 bytes are fixed fields + terminator).
const MAX_BODY: usize = (MAX_FRAME_SIZE - 4 - 10) as usize;

fn arbitrary_type_code() -> impl Strategy<Value = i32> {
    prop_oneof![Just(0), Just(TYPE_EXEC_OR_AUTH_RESPONSE), Just(TYPE_AUTH)]
}

/// ASCII-only body strategy: any byte value is legal, but we avoid `\0`
/// mid-body collisions with the terminator check by restricting to
/// printable ASCII for the round-trip strategy, and cover interior NULs in
/// a dedicated test instead.
fn arbitrary_body(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(1u8..=0x7E, 0..=max_len)
}

fn arbitrary_packet() -> impl Strategy<Value = Packet> {
    (any::<i32>(), arbitrary_type_code(), arbitrary_body(512))
        .prop_map(|(request_id, type_code, body)| Packet::new(request_id, type_code, body))
}

proptest! {
    /// `decode(encode(p)) == p` for every packet whose body fits the frame.
    #[test]
    fn round_trip(packet in arbitrary_packet()) {
        let wire = packet.encode(MAX_FRAME_SIZE).expect("body fits by construction");
        match try_decode_one(&wire, MAX_FRAME_SIZE).expect("decode never errors") {
            DecodeOutcome::Frame(decoded, consumed) => {
                prop_assert_eq!(decoded, packet);
                prop_assert_eq!(consumed, wire.len());
            }
            other => prop_assert!(false, "expected Frame, got {other:?}"),
        }
    }

    /// A packet at exactly the maximum body size still round-trips.
    #[test]
    fn round_trip_at_max_body_size(
        request_id in any::<i32>(),
        type_code in arbitrary_type_code(),
        body in arbitrary_body(MAX_BODY).prop_filter("exact max", move |b| b.len() == MAX_BODY),
    ) {
        let packet = Packet::new(request_id, type_code, body);
        let wire = packet.encode(MAX_FRAME_SIZE).expect("exactly at the boundary");
        prop_assert!(matches!(try_decode_one(&wire, MAX_FRAME_SIZE).unwrap(), DecodeOutcome::Frame(_, _)));
    }

    /// Feeding the encoded bytes one chunk at a time and re-attempting
    /// decode after every append eventually yields exactly one `Frame`, and
    /// `Need` is reported at every earlier prefix.
    #[test]
    fn reassembles_from_arbitrary_chunking(
        packet in arbitrary_packet(),
        chunk_size in 1usize..17,
    ) {
        let wire = packet.encode(MAX_FRAME_SIZE).unwrap();
        let mut buf = Vec::new();
        let mut produced = None;

        for chunk in wire.chunks(chunk_size) {
            buf.extend_from_slice(chunk);
            match try_decode_one(&buf, MAX_FRAME_SIZE).unwrap() {
                DecodeOutcome::Need(_) => {}
                DecodeOutcome::Frame(decoded, consumed) => {
                    produced = Some((decoded, consumed));
                    break;
                }
                DecodeOutcome::Invalid(e) => prop_assert!(false, "unexpected Invalid: {e}"),
            }
        }

        let (decoded, consumed) = produced.expect("a complete frame was eventually available");
        prop_assert_eq!(decoded, packet);
        prop_assert_eq!(consumed, wire.len());
    }

    /// Two packets back to back in one buffer decode independently, in
    /// order, each leaving the other's bytes untouched.
    #[test]
    fn two_packets_in_one_buffer_decode_in_order(
        first in arbitrary_packet(),
        second in arbitrary_packet(),
    ) {
        let mut buf = first.encode(MAX_FRAME_SIZE).unwrap().to_vec();
        buf.extend_from_slice(&second.encode(MAX_FRAME_SIZE).unwrap());

        let (decoded_first, consumed_first) = match try_decode_one(&buf, MAX_FRAME_SIZE).unwrap() {
            DecodeOutcome::Frame(p, n) => (p, n),
            other => panic!("expected Frame, got {other:?}"),
        };
        prop_assert_eq!(&decoded_first, &first);

        let (decoded_second, _consumed_second) =
            match try_decode_one(&buf[consumed_first..], MAX_FRAME_SIZE).unwrap() {
                DecodeOutcome::Frame(p, n) => (p, n),
                other => panic!("expected Frame, got {other:?}"),
            };
        prop_assert_eq!(decoded_second, second);
    }

    /// Interior NUL bytes anywhere in the body survive the round trip.
    #[test]
    fn interior_nul_bytes_survive(
        request_id in any::<i32>(),
        prefix in arbitrary_body(64),
        suffix in arbitrary_body(64),
    ) {
        let mut body = prefix;
        body.push(0);
        body.extend_from_slice(&suffix);

        let packet = Packet::new(request_id, TYPE_EXEC_OR_AUTH_RESPONSE, Bytes::from(body.clone()));
        let wire = packet.encode(MAX_FRAME_SIZE).unwrap();
        match try_decode_one(&wire, MAX_FRAME_SIZE).unwrap() {
            DecodeOutcome::Frame(decoded, _) => prop_assert_eq!(decoded.body.as_ref(), body.as_slice()),
            other => prop_assert!(false, "expected Frame, got {other:?}"),
        }
    }

    /// Any `size_field` strictly greater than `max_frame_size - 4` is
    /// rejected before the body bytes (if any were even supplied) are read.
    #[test]
    fn oversized_size_field_is_always_invalid(extra in 1i32..1_000_000) {
        let size_field = (MAX_FRAME_SIZE - 4).saturating_add(extra);
        let mut buf = vec![0u8; 12];
        buf[0..4].copy_from_slice(&size_field.to_le_bytes());
        prop_assert!(matches!(
            try_decode_one(&buf, MAX_FRAME_SIZE).unwrap(),
            DecodeOutcome::Invalid(_)
        ));
    }
}
