//! TCP transport.
//!
//! RCON has no transport-layer encryption (see the crate-level Non-goals):
//! this is a plain `tokio` TCP listener, configured the way the protocol
//! expects — Nagle's algorithm disabled so responses are flushed
//! immediately instead of batched.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};

use crate::error::ServerError;

/// A bound TCP listener accepting RCON client connections.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Bind to `host:port`.
    pub async fn bind(host: &str, port: u16) -> Result<Self, ServerError> {
        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;

        tracing::info!(%addr, "transport bound");

        Ok(Self { listener })
    }

    /// Accept one incoming connection, configuring it per the protocol's
    /// requirements (Nagle's algorithm disabled).
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ServerError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| ServerError::Transport(format!("accept failed: {e}")))?;

        stream
            .set_nodelay(true)
            .map_err(|e| ServerError::Transport(format!("set_nodelay failed: {e}")))?;

        Ok((stream, addr))
    }

    /// Local address the transport is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::Transport(format!("failed to get local address: {e}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transport_binds_to_loopback() {
        let transport = TcpTransport::bind("127.0.0.1", 0).await;
        assert!(transport.is_ok(), "transport should bind on an ephemeral port");

        let transport = transport.unwrap();
        let addr = transport.local_addr().unwrap();
        assert_ne!(addr.port(), 0, "should have assigned a port");
    }

    #[tokio::test]
    async fn transport_rejects_invalid_host() {
        let result = TcpTransport::bind("not-a-valid-host-at-all.invalid", 0).await;
        assert!(result.is_err());
    }
}
