//! Packet header implementation with zero-copy parsing.
//!
//! The `PacketHeader` is a fixed 12-byte structure, serialized as raw binary
//! in little-endian byte order, matching the wire layout of the Source
//! engine RCON protocol: a 4-byte size field (counting every byte that
//! follows it), a 4-byte request id, and a 4-byte type code.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Fixed 12-byte packet header (little-endian).
///
/// Fields are stored as raw byte arrays rather than native integers so the
/// struct can be cast directly from untrusted network bytes without
/// alignment requirements.
///
/// # Security
///
/// The `#[repr(C, packed)]` layout with `zerocopy` traits ensures this
/// struct can be safely cast from untrusted bytes: every 12-byte pattern is
/// a valid `PacketHeader`, so casting cannot produce undefined behavior. The
/// `size` field is read as a signed `i32` on the wire and must be validated
/// by the caller before it is used as a length — this type only performs the
/// zero-copy cast, not range checking.
#[repr(C, packed)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, PartialEq, Eq)]
pub struct PacketHeader {
    size: [u8; 4],
    request_id: [u8; 4],
    type_code: [u8; 4],
}

impl PacketHeader {
    /// Size of the serialized header (12 bytes).
    pub const SIZE: usize = 12;

    /// Construct a header from already-validated field values.
    #[must_use]
    pub fn new(size: i32, request_id: i32, type_code: i32) -> Self {
        Self {
            size: size.to_le_bytes(),
            request_id: request_id.to_le_bytes(),
            type_code: type_code.to_le_bytes(),
        }
    }

    /// Zero-copy cast from the first 12 bytes of `bytes`.
    ///
    /// Returns `None` if fewer than 12 bytes are available. Performs no
    /// validation of the `size` field — callers must check it themselves.
    #[must_use]
    pub fn ref_from_prefix(bytes: &[u8]) -> Option<&Self> {
        <Self as FromBytes>::ref_from_prefix(bytes).ok().map(|(header, _rest)| header)
    }

    /// Serialize the header to its 12-byte wire form.
    #[must_use]
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let bytes = IntoBytes::as_bytes(&self);
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(bytes);
        arr
    }

    /// Raw `size` field: byte count of everything following this field.
    #[must_use]
    pub fn size(&self) -> i32 {
        i32::from_le_bytes(self.size)
    }

    /// Client- or server-assigned request id used to correlate responses.
    #[must_use]
    pub fn request_id(&self) -> i32 {
        i32::from_le_bytes(self.request_id)
    }

    /// Packet type code (meaning depends on direction, see `type_code`
    /// module).
    #[must_use]
    pub fn type_code(&self) -> i32 {
        i32::from_le_bytes(self.type_code)
    }
}

impl std::fmt::Debug for PacketHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketHeader")
            .field("size", &self.size())
            .field("request_id", &self.request_id())
            .field("type_code", &self.type_code())
            .finish()
    }
}
