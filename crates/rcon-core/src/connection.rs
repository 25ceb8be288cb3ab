//! Per-connection authentication and command-dispatch state machine.
//!
//! Uses the action pattern: methods take time and a packet as input and
//! return actions for the driver (the connection's read task) to execute.
//! This keeps the state machine pure (no I/O, no executor) and makes
//! testing straightforward.
//!
//! # State Machine
//!
//! ```text
//! ┌────────────────┐   Auth, verify ok    ┌───────────────┐
//! │ Unauthenticated │─────────────────────>│ Authenticated │
//! └────────────────┘                      └───────────────┘
//!         │  Auth, verify fails                    │  Auth (refused)
//!         │  any other type                        │  any other type
//!         ↓                                         ↓
//!     ┌────────┐                               ┌────────┐
//!     │ Closed │<──────────────────────────────│ Closed │
//!     └────────┘                               └────────┘
//! ```

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use rcon_protocol::{Packet, TYPE_AUTH, TYPE_EXEC_OR_AUTH_RESPONSE, TYPE_RESPONSE_VALUE};

use crate::{credential::CredentialRecord, error::ConnectionError};

/// Actions returned by the connection state machine.
///
/// The driver (the connection's read task) executes these in order:
/// - `SendPacket`: serialize and write this packet to the peer.
/// - `SubmitCommand`: hand the command body to the executor and, once it
///   resolves, send the resulting `ResponseValue` packet. This is not
///   performed by the state machine itself — executing a command is an
///   I/O-bound operation outside the scope of this pure type.
/// - `Close`: close the connection with the given reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Send this packet to the peer.
    SendPacket(Packet),

    /// Submit `command` (the verbatim `ExecCommand` body) to the executor,
    /// correlating the eventual response with `request_id`.
    SubmitCommand {
        /// Request id to echo on the resulting `ResponseValue`.
        request_id: i32,
        /// Command text, verbatim from the packet body.
        command: String,
    },

    /// Close the connection with this reason.
    Close {
        /// Reason for closing the connection (never sent to the peer).
        reason: String,
    },
}

/// Connection authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No successful `Auth` packet has been processed yet.
    Unauthenticated,
    /// Authentication succeeded; `ExecCommand` packets are accepted.
    Authenticated,
    /// Connection is closed; all further input is silently dropped.
    Closed,
}

/// Per-connection authentication and dispatch state machine.
///
/// This is a pure state machine: no I/O, no executor, no credential store
/// reference. Time is passed as a parameter to methods that need it, and
/// the credential record is passed by reference to `handle_packet` rather
/// than stored, so the same type is equally usable in production and in
/// tests with synthetic time.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct Connection<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    state: ConnectionState,
    last_activity: I,
    commands_executed: u64,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a new connection in [`ConnectionState::Unauthenticated`].
    #[must_use]
    pub fn new(now: I) -> Self {
        Self { state: ConnectionState::Unauthenticated, last_activity: now, commands_executed: 0 }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Timestamp of the most recently processed packet.
    #[must_use]
    pub fn last_activity(&self) -> I {
        self.last_activity
    }

    /// Number of `ExecCommand` packets successfully submitted to the
    /// executor over this connection's lifetime.
    #[must_use]
    pub fn commands_executed(&self) -> u64 {
        self.commands_executed
    }

    /// Mark the connection as closed. Idempotent.
    pub fn close(&mut self) {
        self.state = ConnectionState::Closed;
    }

    /// Process one incoming packet, returning the actions the driver must
    /// perform.
    ///
    /// `credential` is `None` in insecure mode, where every `Auth` attempt
    /// succeeds regardless of body.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::ProtocolViolation`] when a packet type is
    /// not valid for the current state. Callers should treat this exactly
    /// like an explicit `Close` action: the connection is unusable from
    /// this point on.
    pub fn handle_packet(
        &mut self,
        packet: &Packet,
        credential: Option<&CredentialRecord>,
        now: I,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        self.last_activity = now;

        match self.state {
            ConnectionState::Closed => Ok(vec![]),

            ConnectionState::Unauthenticated => match packet.type_code {
                TYPE_AUTH => self.handle_auth(packet, credential),
                _ => {
                    self.state = ConnectionState::Closed;
                    Err(ConnectionError::ProtocolViolation {
                        state: ConnectionState::Unauthenticated,
                        type_code: packet.type_code,
                    })
                },
            },

            ConnectionState::Authenticated => match packet.type_code {
                TYPE_EXEC_OR_AUTH_RESPONSE => {
                    self.commands_executed += 1;
                    let command = std::str::from_utf8(&packet.body)
                        .map_err(|_| ConnectionError::Protocol("command body is not UTF-8".into()))?
                        .to_string();
                    Ok(vec![ConnectionAction::SubmitCommand {
                        request_id: packet.request_id,
                        command,
                    }])
                },
                TYPE_AUTH => {
                    self.state = ConnectionState::Closed;
                    Err(ConnectionError::ReAuthenticationRefused)
                },
                TYPE_RESPONSE_VALUE => Ok(vec![]),
                other => {
                    self.state = ConnectionState::Closed;
                    Err(ConnectionError::ProtocolViolation {
                        state: ConnectionState::Authenticated,
                        type_code: other,
                    })
                },
            },
        }
    }

    fn handle_auth(
        &mut self,
        packet: &Packet,
        credential: Option<&CredentialRecord>,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        let candidate = std::str::from_utf8(&packet.body)
            .map_err(|_| ConnectionError::Protocol("auth body is not UTF-8".into()))?;

        let verified = match credential {
            None => true,
            Some(record) => record.verify(candidate),
        };

        let response = Packet::auth_response(packet.request_id, verified);

        if verified {
            self.state = ConnectionState::Authenticated;
            Ok(vec![ConnectionAction::SendPacket(response)])
        } else {
            self.state = ConnectionState::Closed;
            Ok(vec![
                ConnectionAction::SendPacket(response),
                ConnectionAction::Close { reason: "authentication failed".to_string() },
            ])
        }
    }
}
