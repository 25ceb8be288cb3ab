//! Wire format for the Source engine RCON protocol.
//!
//! This crate is pure and I/O-free: it defines the packet header, the
//! `Packet` type, and the streaming decode/encode contract used by
//! `rcon-core` and `rcon-server`. It does not know about sockets, time, or
//! authentication.

mod errors;
mod header;
mod packet;

pub use errors::{ProtocolError, Result};
pub use header::PacketHeader;
pub use packet::{
    DecodeOutcome, Packet, TYPE_AUTH, TYPE_EXEC_OR_AUTH_RESPONSE, TYPE_RESPONSE_VALUE,
    try_decode_one,
};

/// Default maximum total frame length (header + body + terminator) accepted
/// or emitted when no configuration overrides it.
pub const DEFAULT_MAX_FRAME_SIZE: i32 = 4096;
