//! Server-level error types.

use thiserror::Error;

/// Errors that can occur in the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, bad credential string,
    /// zero timeout, etc.).
    ///
    /// Fatal: prevents server startup. Fix configuration and restart.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Transport/network error (bind failure, accept failure, I/O error).
    ///
    /// A bind failure is fatal-to-server (propagated to the caller of
    /// `ConnectionManager::bind`, per the error taxonomy). Per-connection
    /// transport errors are handled inline by the owning read task and
    /// never reach this variant.
    #[error("transport error: {0}")]
    Transport(String),
}
