//! Packet type and the streaming decode/encode contract.
//!
//! A `Packet` is the logical unit of the RCON wire protocol:
//! `[size_field: 4B LE][request_id: 4B LE][type_code: 4B LE][body][0x00][0x00]`
//!
//! `size_field` counts every byte that follows it (request id, type code,
//! body, and both terminator bytes), so the total length on the wire is
//! `4 + size_field`.

use bytes::{BufMut, Bytes};

use crate::{
    errors::{ProtocolError, Result},
    header::PacketHeader,
};

/// Fixed-size portion of a packet besides the body (`request_id` +
/// `type_code` + two terminator bytes).
const FIXED_TAIL: i32 = 10;

/// `SERVERDATA_RESPONSE_VALUE` / `SERVERDATA_AUTH_RESPONSE` / command
/// response packets sent server -> client.
pub const TYPE_RESPONSE_VALUE: i32 = 0;

/// `SERVERDATA_EXECCOMMAND` (client -> server) and `SERVERDATA_AUTH_RESPONSE`
/// (server -> client); the two share a type code and are disambiguated by
/// direction, never by value.
pub const TYPE_EXEC_OR_AUTH_RESPONSE: i32 = 2;

/// `SERVERDATA_AUTH`, client -> server.
pub const TYPE_AUTH: i32 = 3;

/// A decoded or to-be-encoded RCON packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Client-chosen correlation id, echoed verbatim on responses.
    pub request_id: i32,
    /// Packet type code; meaning depends on direction (see `TYPE_*`
    /// constants).
    pub type_code: i32,
    /// Packet body. May contain interior NUL bytes; always valid UTF-8.
    pub body: Bytes,
}

impl Packet {
    /// Construct a packet from its three logical fields.
    #[must_use]
    pub fn new(request_id: i32, type_code: i32, body: impl Into<Bytes>) -> Self {
        Self { request_id, type_code, body: body.into() }
    }

    /// Build the `AuthResponse` packet for a successful or failed auth
    /// attempt, echoing `request_id` from the triggering `Auth` packet.
    #[must_use]
    pub fn auth_response(request_id: i32, success: bool) -> Self {
        let body: &'static str = if success { "1" } else { "-1" };
        Self::new(request_id, TYPE_EXEC_OR_AUTH_RESPONSE, Bytes::from_static(body.as_bytes()))
    }

    /// Build a `ResponseValue` packet carrying `body` as command output (or
    /// an error indicator), echoing `request_id` from the triggering
    /// `ExecCommand`.
    #[must_use]
    pub fn response_value(request_id: i32, body: impl Into<Bytes>) -> Self {
        Self::new(request_id, TYPE_RESPONSE_VALUE, body)
    }

    /// Encode this packet to its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BodyTooLarge`] if the encoded frame would
    /// exceed `max_frame_size` bytes.
    pub fn encode(&self, max_frame_size: i32) -> Result<Bytes> {
        let body_len = self.body.len();
        #[allow(clippy::cast_possible_wrap)]
        let size_field = FIXED_TAIL
            .checked_add(body_len as i32)
            .filter(|&size| size <= max_frame_size - 4)
            .ok_or(ProtocolError::BodyTooLarge {
                size: body_len,
                max: (max_frame_size - 4 - FIXED_TAIL).max(0) as usize,
            })?;

        let header = PacketHeader::new(size_field, self.request_id, self.type_code);

        let mut buf = Vec::with_capacity(4 + size_field as usize);
        buf.put_slice(&header.to_bytes());
        buf.put_slice(&self.body);
        buf.put_u8(0);
        buf.put_u8(0);

        Ok(Bytes::from(buf))
    }

    /// Attempt to decode exactly one packet from the front of `buf`.
    ///
    /// Does not consume `buf`; callers use the returned byte count on
    /// [`DecodeOutcome::Frame`] to advance their own cursor.
    ///
    /// # Errors
    ///
    /// Returns `Err` only when the enclosing [`DecodeOutcome`] would be
    /// [`DecodeOutcome::Invalid`] — callers typically use
    /// [`try_decode_one`] instead, which folds both cases into one enum.
    pub fn decode(buf: &[u8], max_frame_size: i32) -> Result<DecodeOutcome> {
        try_decode_one(buf, max_frame_size)
    }
}

/// Result of attempting to decode one packet from a byte buffer.
#[derive(Debug)]
pub enum DecodeOutcome {
    /// Not enough bytes yet; at least this many more are required before
    /// decoding can be retried.
    Need(usize),
    /// A complete packet was decoded, consuming this many bytes from the
    /// front of the buffer.
    Frame(Packet, usize),
    /// The buffer can never yield a valid packet starting at this position;
    /// the connection must be closed.
    Invalid(ProtocolError),
}

/// Attempt to decode exactly one packet from the front of `buf`.
///
/// Validation order mirrors the wire format's own framing: the integer
/// bounds on `size_field` are checked before anything is read out of the
/// body, so a hostile `size_field` can never trigger an allocation.
///
/// # Errors
///
/// This function does not return `Err`; structural problems are reported
/// as `DecodeOutcome::Invalid` so callers can handle "not enough bytes yet"
/// and "this will never be valid" uniformly.
#[allow(clippy::missing_errors_doc)]
pub fn try_decode_one(buf: &[u8], max_frame_size: i32) -> Result<DecodeOutcome> {
    if buf.len() < 4 {
        return Ok(DecodeOutcome::Need(4 - buf.len()));
    }

    let Some(header) = PacketHeader::ref_from_prefix(buf) else {
        return Ok(DecodeOutcome::Need(PacketHeader::SIZE - buf.len()));
    };

    let size_field = header.size();

    if size_field < 0 {
        return Ok(DecodeOutcome::Invalid(ProtocolError::NegativeSize(size_field)));
    }

    if size_field > max_frame_size.saturating_sub(4) {
        // Still guard against overflow even when max_frame_size is
        // misconfigured to something absurd.
        if size_field > i32::MAX - 4 {
            return Ok(DecodeOutcome::Invalid(ProtocolError::SizeOverflow(size_field)));
        }
        return Ok(DecodeOutcome::Invalid(ProtocolError::SizeTooLarge {
            actual: size_field,
            max: max_frame_size - 4,
        }));
    }

    if size_field < FIXED_TAIL {
        return Ok(DecodeOutcome::Invalid(ProtocolError::SizeTooSmall {
            actual: size_field,
            minimum: FIXED_TAIL,
        }));
    }

    let total_len = 4 + size_field as usize;

    if buf.len() < total_len {
        return Ok(DecodeOutcome::Need(total_len - buf.len()));
    }

    let body_len = size_field as usize - FIXED_TAIL as usize;
    let body_start = PacketHeader::SIZE;
    let body_end = body_start + body_len;

    let body_bytes = &buf[body_start..body_end];
    let terminator = &buf[body_end..total_len];

    if terminator != [0u8, 0u8] {
        return Ok(DecodeOutcome::Invalid(ProtocolError::MissingTerminator));
    }

    if std::str::from_utf8(body_bytes).is_err() {
        return Ok(DecodeOutcome::Invalid(ProtocolError::InvalidUtf8));
    }

    let packet = Packet {
        request_id: header.request_id(),
        type_code: header.type_code(),
        body: Bytes::copy_from_slice(body_bytes),
    };

    Ok(DecodeOutcome::Frame(packet, total_len))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MAX: i32 = 4096;

    #[test]
    fn round_trip_empty_body() {
        let packet = Packet::new(1, TYPE_AUTH, Bytes::new());
        let wire = packet.encode(MAX).expect("encode");
        match try_decode_one(&wire, MAX).expect("decode") {
            DecodeOutcome::Frame(decoded, consumed) => {
                assert_eq!(decoded, packet);
                assert_eq!(consumed, wire.len());
            },
            other => panic!("expected Frame, got {other:?}"),
        }
    }

    #[test]
    fn round_trip_with_body() {
        let packet = Packet::new(42, TYPE_EXEC_OR_AUTH_RESPONSE, Bytes::from_static(b"hello world"));
        let wire = packet.encode(MAX).expect("encode");
        match try_decode_one(&wire, MAX).expect("decode") {
            DecodeOutcome::Frame(decoded, consumed) => {
                assert_eq!(decoded, packet);
                assert_eq!(consumed, wire.len());
            },
            other => panic!("expected Frame, got {other:?}"),
        }
    }

    #[test]
    fn need_more_bytes_for_partial_header() {
        let buf = [0u8; 6];
        assert!(matches!(try_decode_one(&buf, MAX).unwrap(), DecodeOutcome::Need(_)));
    }

    #[test]
    fn need_more_bytes_for_partial_body() {
        let packet = Packet::new(1, TYPE_AUTH, Bytes::from_static(b"password"));
        let wire = packet.encode(MAX).unwrap();
        let partial = &wire[..wire.len() - 3];
        assert!(matches!(try_decode_one(partial, MAX).unwrap(), DecodeOutcome::Need(_)));
    }

    #[test]
    fn rejects_negative_size() {
        let mut buf = [0u8; 12];
        buf[0..4].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            try_decode_one(&buf, MAX).unwrap(),
            DecodeOutcome::Invalid(ProtocolError::NegativeSize(-1))
        ));
    }

    #[test]
    fn size_field_9_is_rejected() {
        let mut buf = [0u8; 13];
        buf[0..4].copy_from_slice(&9i32.to_le_bytes());
        assert!(matches!(
            try_decode_one(&buf, MAX).unwrap(),
            DecodeOutcome::Invalid(ProtocolError::SizeTooSmall { actual: 9, minimum: 10 })
        ));
    }

    #[test]
    fn size_field_at_max_minus_4_with_max_body_is_accepted() {
        let size_field = MAX - 4;
        let body_len = size_field as usize - FIXED_TAIL as usize;
        let body = vec![b'x'; body_len];
        let packet = Packet::new(1, TYPE_EXEC_OR_AUTH_RESPONSE, body);
        let wire = packet.encode(MAX).expect("should encode at the boundary");
        assert!(matches!(try_decode_one(&wire, MAX).unwrap(), DecodeOutcome::Frame(_, _)));
    }

    #[test]
    fn size_field_max_minus_3_is_rejected() {
        let size_field = MAX - 3;
        let mut buf = vec![0u8; 4 + size_field as usize];
        buf[0..4].copy_from_slice(&size_field.to_le_bytes());
        assert!(matches!(
            try_decode_one(&buf, MAX).unwrap(),
            DecodeOutcome::Invalid(ProtocolError::SizeTooLarge { .. })
        ));
    }

    #[test]
    fn size_field_i32_max_is_rejected_without_allocation() {
        let mut buf = [0u8; 12];
        buf[0..4].copy_from_slice(&0x7FFF_FFFFi32.to_le_bytes());
        assert!(matches!(
            try_decode_one(&buf, MAX).unwrap(),
            DecodeOutcome::Invalid(ProtocolError::SizeOverflow(0x7FFF_FFFF))
        ));
    }

    #[test]
    fn missing_terminator_is_rejected() {
        let mut buf = vec![0u8; 14];
        buf[0..4].copy_from_slice(&10i32.to_le_bytes());
        buf[12] = b'x';
        buf[13] = 0;
        assert!(matches!(
            try_decode_one(&buf, MAX).unwrap(),
            DecodeOutcome::Invalid(ProtocolError::MissingTerminator)
        ));
    }

    #[test]
    fn interior_nul_bytes_in_body_are_preserved() {
        let body = Bytes::from_static(b"a\0b\0c");
        let packet = Packet::new(1, TYPE_EXEC_OR_AUTH_RESPONSE, body.clone());
        let wire = packet.encode(MAX).unwrap();
        match try_decode_one(&wire, MAX).unwrap() {
            DecodeOutcome::Frame(decoded, _) => assert_eq!(decoded.body, body),
            other => panic!("expected Frame, got {other:?}"),
        }
    }

    #[test]
    fn trailing_garbage_does_not_affect_decode_of_first_frame() {
        let packet = Packet::new(1, TYPE_AUTH, Bytes::from_static(b"pw"));
        let mut wire = packet.encode(MAX).unwrap().to_vec();
        wire.extend_from_slice(b"garbage-from-the-next-frame");
        match try_decode_one(&wire, MAX).unwrap() {
            DecodeOutcome::Frame(decoded, consumed) => {
                assert_eq!(decoded, packet);
                assert!(consumed < wire.len());
            },
            other => panic!("expected Frame, got {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_body_is_rejected() {
        let mut buf = vec![0u8; 13];
        buf[0..4].copy_from_slice(&11i32.to_le_bytes());
        buf[8..12].copy_from_slice(&TYPE_AUTH.to_le_bytes());
        buf[12] = 0xFF;
        buf.push(0);
        buf.push(0);
        assert!(matches!(
            try_decode_one(&buf, MAX).unwrap(),
            DecodeOutcome::Invalid(ProtocolError::InvalidUtf8)
        ));
    }

    #[test]
    fn encode_rejects_oversized_body() {
        let body = vec![b'x'; MAX as usize];
        let packet = Packet::new(1, TYPE_EXEC_OR_AUTH_RESPONSE, body);
        assert!(matches!(packet.encode(MAX), Err(ProtocolError::BodyTooLarge { .. })));
    }
}
