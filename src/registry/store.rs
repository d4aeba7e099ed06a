//! Connection registry implementation
//!
//! The central registry that owns all live device connections, keyed by
//! client id. Thread-safe via `RwLock`; the event loop, dispatcher workers,
//! send path and sweeper all operate on it concurrently. No socket I/O
//! happens while the map lock is held — closing is a non-blocking
//! deactivate-and-notify, the socket drops with the entry.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use super::connection::{ClientConnection, ConnWriter, ConnectionStatus};
use super::error::RegistryError;
use crate::stats::ConnectionStatistics;

/// Central registry for all live device connections
pub struct ConnectionRegistry {
    /// Map of client id to connection
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,

    /// Connections ever added (history, not current)
    total_connections: AtomicU64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            total_connections: AtomicU64::new(0),
        }
    }

    /// Register a connection for a client
    ///
    /// At most one connection exists per id: a prior entry under the same id
    /// is closed and replaced (last writer wins).
    pub async fn add(
        &self,
        client_id: &str,
        peer_addr: SocketAddr,
        writer: ConnWriter,
    ) -> Result<Arc<ClientConnection>, RegistryError> {
        if client_id.trim().is_empty() {
            return Err(RegistryError::InvalidArgument(
                "client id cannot be empty".into(),
            ));
        }

        let connection = Arc::new(ClientConnection::new(client_id, peer_addr, writer));

        let replaced = {
            let mut connections = self.connections.write().await;
            connections.insert(client_id.to_string(), Arc::clone(&connection))
        };

        if let Some(old) = replaced {
            tracing::info!(client = %client_id, "Replacing existing connection for address");
            old.close();
        }

        self.total_connections.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(client = %client_id, peer = %peer_addr, "Connection added");

        Ok(connection)
    }

    /// Remove and close a connection; no-op if absent
    pub async fn remove(&self, client_id: &str) {
        let removed = {
            let mut connections = self.connections.write().await;
            connections.remove(client_id)
        };

        if let Some(connection) = removed {
            connection.close();
            tracing::debug!(client = %client_id, "Connection removed");
        }
    }

    /// Remove a connection only if it is still the registered entry
    ///
    /// A replaced connection's read task must not tear down the successor
    /// that took over its id.
    pub async fn remove_if_current(&self, connection: &Arc<ClientConnection>) {
        let removed = {
            let mut connections = self.connections.write().await;
            let is_current = connections
                .get(connection.client_id())
                .map(|current| Arc::ptr_eq(current, connection))
                .unwrap_or(false);

            if is_current {
                connections.remove(connection.client_id())
            } else {
                None
            }
        };

        connection.close();
        if removed.is_some() {
            tracing::debug!(client = %connection.client_id(), "Connection removed");
        }
    }

    /// Update last-activity for an active connection
    pub async fn touch(&self, client_id: &str) {
        let connections = self.connections.read().await;
        if let Some(connection) = connections.get(client_id) {
            if connection.is_active() {
                connection.touch();
            }
        }
    }

    /// Whether the client has a live, active connection
    pub async fn is_active(&self, client_id: &str) -> bool {
        let connections = self.connections.read().await;
        connections
            .get(client_id)
            .map(|c| c.is_active())
            .unwrap_or(false)
    }

    /// Look up a connection by id
    pub async fn get(&self, client_id: &str) -> Option<Arc<ClientConnection>> {
        let connections = self.connections.read().await;
        connections.get(client_id).cloned()
    }

    /// Snapshot of the currently active client ids
    pub async fn active_ids(&self) -> HashSet<String> {
        let connections = self.connections.read().await;
        connections
            .iter()
            .filter(|(_, c)| c.is_active())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of active connections
    pub async fn active_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.values().filter(|c| c.is_active()).count()
    }

    /// Number of entries currently in the map (active or not)
    pub async fn current_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Connections ever registered
    pub fn total_count(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    /// Remove and close every connection that is inactive or idle beyond the
    /// threshold; returns the number removed
    pub async fn sweep_timeouts(&self, threshold: Duration) -> usize {
        let mut connections = self.connections.write().await;

        let stale: Vec<String> = connections
            .iter()
            .filter(|(_, c)| !c.is_active() || c.idle_duration() > threshold)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            if let Some(connection) = connections.remove(id) {
                connection.close();
                tracing::debug!(client = %id, "Connection timeout removed");
            }
        }

        if !stale.is_empty() {
            tracing::info!(count = stale.len(), "Cleaned up timed-out connections");
        }

        stale.len()
    }

    /// Close and drop every connection
    pub async fn close_all(&self) {
        let mut connections = self.connections.write().await;
        tracing::info!(count = connections.len(), "Closing all connections");

        for connection in connections.values() {
            connection.close();
        }
        connections.clear();
    }

    /// Registry-wide statistics snapshot
    pub async fn statistics(&self) -> ConnectionStatistics {
        let active = self.active_count().await;
        let current = self.current_count().await;
        let total = self.total_count();

        ConnectionStatistics {
            active_connections: active,
            current_connections: current,
            total_connections: total,
            connection_success_rate: if total > 0 {
                active as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        }
    }

    /// Status snapshot of every connection
    pub async fn all_status(&self) -> HashMap<String, ConnectionStatus> {
        let connections = self.connections.read().await;
        connections
            .iter()
            .map(|(id, c)| (id.clone(), c.status()))
            .collect()
    }

    /// Spawn the background timeout sweep
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_sweep_task(
        self: &Arc<Self>,
        interval: Duration,
        threshold: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.sweep_timeouts(threshold).await;
            }
        })
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
