//! Connection registry.
//!
//! Tracks every live connection by `connection_id`. Unlike a single
//! `Mutex<HashMap<_>>`, `dashmap::DashMap` shards its internal locking so
//! the acceptor registering a new connection never blocks the idle
//! reaper sweeping existing ones, or a read task looking itself up.

use std::sync::Arc;

use dashmap::DashMap;

use crate::connection_handle::ConnectionHandle;

/// Registry of live connections, keyed by `connection_id`.
#[derive(Default)]
pub struct Registry {
    connections: DashMap<u64, Arc<ConnectionHandle>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection. Overwrites silently if `connection_id`
    /// were ever reused, which cannot happen given a monotonic counter.
    pub fn register(&self, handle: Arc<ConnectionHandle>) {
        self.connections.insert(handle.connection_id, handle);
    }

    /// Remove a connection. Idempotent: returns `None` if already removed.
    pub fn remove(&self, connection_id: u64) -> Option<Arc<ConnectionHandle>> {
        self.connections.remove(&connection_id).map(|(_, handle)| handle)
    }

    /// Look up a connection by id.
    #[must_use]
    pub fn get(&self, connection_id: u64) -> Option<Arc<ConnectionHandle>> {
        self.connections.get(&connection_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of currently registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// True if no connections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Snapshot the handles of every currently registered connection, for
    /// the idle reaper to sweep.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<ConnectionHandle>> {
        self.connections.iter().map(|entry| Arc::clone(entry.value())).collect()
    }
}
