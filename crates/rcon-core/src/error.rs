//! Error types for the RCON core state machine.
//!
//! We avoid using `std::io::Error` for protocol logic to maintain type
//! safety and enable proper error handling and recovery.

use std::io;

use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors that can occur during connection state machine operations.
///
/// Every variant here is fatal to the connection: the state machine
/// transitions to [`ConnectionState::Closed`] before returning any of
/// these, so the only remaining action for the driver is to report the
/// reason and tear the connection down.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Received a packet type that is not valid for the current state.
    #[error("protocol violation: packet type {type_code} is invalid in state {state:?}")]
    ProtocolViolation {
        /// State the connection was in when the violation occurred.
        state: ConnectionState,
        /// Type code of the offending packet.
        type_code: i32,
    },

    /// An authenticated connection attempted to re-authenticate.
    #[error("re-authentication refused")]
    ReAuthenticationRefused,

    /// A packet body that must be text (auth credential or command) was
    /// not valid UTF-8, or some other protocol-level inconsistency was
    /// found outside the wire codec itself.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Underlying transport error surfaced from the read or write side of
    /// the connection.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ConnectionError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// None of this state machine's own errors are transient: every one of
    /// them indicates a protocol violation or a broken peer, never a
    /// temporary condition. Transience, where it exists (read timeouts,
    /// connection caps), is handled entirely at the connection-manager
    /// layer and never surfaces as a `ConnectionError`.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        false
    }
}

/// Convert `ConnectionError` to `io::Error` for compatibility with async
/// I/O APIs.
impl From<ConnectionError> for io::Error {
    fn from(err: ConnectionError) -> Self {
        let kind = match &err {
            ConnectionError::ProtocolViolation { .. }
            | ConnectionError::ReAuthenticationRefused
            | ConnectionError::Protocol(_) => io::ErrorKind::InvalidData,
            ConnectionError::Transport(_) => io::ErrorKind::Other,
        };
        Self::new(kind, err.to_string())
    }
}

/// Convert rcon-protocol errors to `ConnectionError`.
impl From<rcon_protocol::ProtocolError> for ConnectionError {
    fn from(err: rcon_protocol::ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Convert `io::Error` to `ConnectionError` (for transport errors).
impl From<io::Error> for ConnectionError {
    fn from(err: io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn no_connection_errors_are_transient() {
        assert!(
            !ConnectionError::ProtocolViolation {
                state: ConnectionState::Unauthenticated,
                type_code: 99,
            }
            .is_transient()
        );
        assert!(!ConnectionError::ReAuthenticationRefused.is_transient());
        assert!(!ConnectionError::Protocol("bad body".to_string()).is_transient());
        assert!(!ConnectionError::Transport("socket reset".to_string()).is_transient());
    }
}
