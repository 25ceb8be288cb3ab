//! Error types for packet framing and the RCON wire codec.

use thiserror::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Everything that can go wrong while decoding or encoding a packet.
///
/// Every variant here corresponds to a structurally malformed packet, never
/// to a transport failure (those stay as `io::Error` at the caller).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The size field, interpreted as a signed `i32`, was negative.
    #[error("packet size field is negative: {0}")]
    NegativeSize(i32),

    /// The size field was large enough that `size + 4` would overflow `i32`.
    #[error("packet size field {0} would overflow on length calculation")]
    SizeOverflow(i32),

    /// The size field claimed fewer than the 10 bytes required for an
    /// empty-body packet (`request_id` + `type_code` + 2 terminator bytes).
    #[error("packet size field {actual} is smaller than the minimum of {minimum}")]
    SizeTooSmall {
        /// The size field read from the wire.
        actual: i32,
        /// The minimum legal size field value (10).
        minimum: i32,
    },

    /// The size field claimed more than `max_frame_size - 4` bytes of body.
    #[error("packet size field {actual} exceeds the configured maximum of {max}")]
    SizeTooLarge {
        /// The size field read from the wire.
        actual: i32,
        /// The maximum legal size field value for the active configuration.
        max: i32,
    },

    /// The two bytes immediately following the body were not both `0x00`.
    #[error("packet body is not terminated by two NUL bytes")]
    MissingTerminator,

    /// The body bytes were not valid UTF-8.
    #[error("packet body is not valid UTF-8")]
    InvalidUtf8,

    /// An outgoing packet's body would make the encoded frame exceed
    /// `max_frame_size`.
    #[error("encoded packet body of {size} bytes exceeds the configured maximum of {max} bytes")]
    BodyTooLarge {
        /// The body length that was rejected.
        size: usize,
        /// The maximum body length for the active configuration.
        max: usize,
    },
}
