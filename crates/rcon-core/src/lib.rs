//! Pure (I/O-free) core of the RCON server: credential verification and
//! the per-connection authentication/dispatch state machine.
//!
//! Nothing in this crate touches a socket or a clock directly — time and
//! randomness for production use are supplied by the embedding
//! `rcon-server` crate through the [`env::Environment`] trait and the
//! `getrandom` crate respectively.

pub mod connection;
pub mod credential;
pub mod env;
pub mod error;

pub use connection::{Connection, ConnectionAction, ConnectionState};
pub use credential::{CredentialDecodeError, CredentialRecord};
pub use env::Environment;
pub use error::ConnectionError;
