//! The shared, registry-visible half of a connection's state.
//!
//! Split from the per-connection state machine and receive buffer (which
//! live purely inside the owning read task, see `manager::run_connection`)
//! so that the idle reaper and the acceptor can touch a connection's
//! liveness and write side without contending with its read task on
//! anything but a single lock per write.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{
    net::tcp::OwnedWriteHalf,
    sync::{Mutex, Semaphore},
};
use tokio_util::sync::CancellationToken;

/// Shared state for one connection, held in the registry.
///
/// `last_activity` and the write half are the only pieces of connection
/// state any task other than the owning read task ever touches.
pub struct ConnectionHandle {
    /// Process-unique, stable identity for this connection's lifetime.
    pub connection_id: u64,
    /// Remote peer address, for logging.
    pub remote_addr: std::net::SocketAddr,
    /// Milliseconds since the manager started, updated on every packet
    /// processed by the owning read task and read by the idle reaper.
    last_activity_ms: AtomicU64,
    /// Serializes writes to the socket; a single permit bounds in-flight
    /// writes to exactly one at a time per connection.
    write_permit: Semaphore,
    write_half: Mutex<OwnedWriteHalf>,
    /// Signals the owning read task to stop at its next observation point
    /// and exit through its own close/log/registry-remove path, used by the
    /// idle reaper and by graceful shutdown. Never aborts the task directly.
    close: CancellationToken,
}

impl ConnectionHandle {
    /// Construct a new handle. `now_ms` is the creation timestamp. `close`
    /// is the token the owning read task selects on to learn it must stop;
    /// the caller keeps its own clone to hand to that task.
    #[must_use]
    pub fn new(
        connection_id: u64,
        remote_addr: std::net::SocketAddr,
        write_half: OwnedWriteHalf,
        close: CancellationToken,
        now_ms: u64,
    ) -> Self {
        Self {
            connection_id,
            remote_addr,
            last_activity_ms: AtomicU64::new(now_ms),
            write_permit: Semaphore::new(1),
            write_half: Mutex::new(write_half),
            close,
        }
    }

    /// Record activity at `now_ms`.
    pub fn touch(&self, now_ms: u64) {
        self.last_activity_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Milliseconds-since-start timestamp of the most recent activity.
    #[must_use]
    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms.load(Ordering::Relaxed)
    }

    /// Write `bytes` to the socket, serialized against any other writer of
    /// this connection by the single-permit semaphore.
    pub async fn write_all(&self, bytes: &[u8]) -> std::io::Result<()> {
        use tokio::io::AsyncWriteExt;

        #[allow(clippy::expect_used)]
        let _permit =
            self.write_permit.acquire().await.expect("write_permit semaphore is never closed");
        let mut half = self.write_half.lock().await;
        half.write_all(bytes).await
    }

    /// Ask the owning read task to close. Safe to call more than once; the
    /// task notices at its next `close`/read select and exits normally.
    pub fn request_close(&self) {
        self.close.cancel();
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("connection_id", &self.connection_id)
            .field("remote_addr", &self.remote_addr)
            .field("last_activity_ms", &self.last_activity_ms())
            .finish_non_exhaustive()
    }
}

/// A handle the registry hands out; cheap to clone, shared across tasks.
pub type SharedConnectionHandle = Arc<ConnectionHandle>;
