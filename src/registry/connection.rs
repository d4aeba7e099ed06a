//! Per-device connection state
//!
//! One `ClientConnection` exists per admitted device socket. The registry is
//! its sole owner; the event loop and send path look connections up by id and
//! hold the `Arc` only for the duration of one operation.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, Notify};

/// Write half of a device socket
///
/// Boxed so tests can substitute in-memory transports for real TCP streams.
pub type ConnWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// State for a single admitted device connection
pub struct ClientConnection {
    /// Client identifier (remote IP address)
    client_id: String,

    /// Full remote address
    peer_addr: SocketAddr,

    /// Socket write half; the mutex serializes writers so frames are never
    /// interleaved on the wire
    writer: Mutex<ConnWriter>,

    /// Wakes the connection's read task on close
    shutdown: Notify,

    /// When the connection was established
    connected_at: Instant,

    /// Last activity, as milliseconds since `connected_at`
    last_activity_ms: AtomicU64,

    /// Whether the connection is live
    active: AtomicBool,

    bytes_received: AtomicU64,
    bytes_sent: AtomicU64,
    message_count: AtomicU64,
}

impl ClientConnection {
    pub fn new(client_id: impl Into<String>, peer_addr: SocketAddr, writer: ConnWriter) -> Self {
        Self {
            client_id: client_id.into(),
            peer_addr,
            writer: Mutex::new(writer),
            shutdown: Notify::new(),
            connected_at: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            active: AtomicBool::new(true),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            message_count: AtomicU64::new(0),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Update the last-activity timestamp
    ///
    /// Activity time is monotonically non-decreasing: concurrent touches race
    /// only over which recent instant wins.
    pub fn touch(&self) {
        let elapsed = self.connected_at.elapsed().as_millis() as u64;
        self.last_activity_ms.fetch_max(elapsed, Ordering::Relaxed);
    }

    /// Time since the last recorded activity
    pub fn idle_duration(&self) -> Duration {
        let elapsed = self.connected_at.elapsed();
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        elapsed.saturating_sub(last)
    }

    /// Time since the connection was established
    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }

    pub fn add_bytes_received(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
        self.touch();
    }

    pub fn add_bytes_sent(&self, bytes: u64) {
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
        self.touch();
    }

    pub fn increment_message_count(&self) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Write a full buffer to the socket, one writer at a time
    pub async fn write(&self, data: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(data).await?;
        writer.flush().await
    }

    /// Future that resolves once the connection has been closed
    pub async fn closed(&self) {
        self.shutdown.notified().await;
    }

    /// Mark the connection inactive without waking the read task
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    /// Close the connection: deactivate and wake the read task
    ///
    /// Non-blocking; the socket itself closes when the read task drops its
    /// half and the registry drops this entry. Safe to call more than once.
    pub fn close(&self) {
        if self.active.swap(false, Ordering::Relaxed) {
            tracing::debug!(client = %self.client_id, "Connection closed");
        }
        self.shutdown.notify_one();
    }

    /// Point-in-time snapshot of the connection state
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            client_id: self.client_id.clone(),
            peer_addr: self.peer_addr,
            active: self.is_active(),
            connection_duration: self.connection_duration(),
            inactivity_duration: self.idle_duration(),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            message_count: self.message_count.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("client_id", &self.client_id)
            .field("peer_addr", &self.peer_addr)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Snapshot of a connection's state and counters
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub client_id: String,
    pub peer_addr: SocketAddr,
    pub active: bool,
    pub connection_duration: Duration,
    pub inactivity_duration: Duration,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub message_count: u64,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Status{{client='{}', active={}, duration={}ms, inactive={}ms, bytes={}/{}, msgs={}}}",
            self.client_id,
            self.active,
            self.connection_duration.as_millis(),
            self.inactivity_duration.as_millis(),
            self.bytes_received,
            self.bytes_sent,
            self.message_count
        )
    }
}
