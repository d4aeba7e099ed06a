//! Operational API facade
//!
//! The surface consumed by external collaborators (REST layer, HTTP relay):
//! opcode-addressed sends, broadcast and group sends, client lifecycle
//! queries, and statistics. Argument and admission-style failures surface
//! synchronously; nothing here mutates state on a rejected call.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{GatewayError, Result};
use crate::protocol::constants::{is_opcode_supported, SUPPORTED_OPCODES};
use crate::protocol::{build_frame, format_opcode};
use crate::registry::ConnectionRegistry;
use crate::stats::{CommsStats, ConnectionStatistics};
use crate::transport::{MessageSender, TransmissionLog};

/// High-level messaging and connection management API
pub struct CommsService {
    registry: Arc<ConnectionRegistry>,
    sender: Arc<MessageSender>,
    tracking: Arc<TransmissionLog>,

    total_messages_sent: AtomicU64,
    total_broadcasts_sent: AtomicU64,
    total_group_messages_sent: AtomicU64,
}

impl CommsService {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        sender: Arc<MessageSender>,
        tracking: Arc<TransmissionLog>,
    ) -> Self {
        Self {
            registry,
            sender,
            tracking,
            total_messages_sent: AtomicU64::new(0),
            total_broadcasts_sent: AtomicU64::new(0),
            total_group_messages_sent: AtomicU64::new(0),
        }
    }

    // ---- connection management ----

    /// Snapshot of active client ids
    pub async fn active_clients(&self) -> HashSet<String> {
        self.registry.active_ids().await
    }

    /// Whether the client has a live connection
    pub async fn is_client_active(&self, client_id: &str) -> bool {
        if client_id.trim().is_empty() {
            return false;
        }
        self.registry.is_active(client_id).await
    }

    /// Remove a client and clear its history
    pub async fn remove_client(&self, client_id: &str) {
        if client_id.trim().is_empty() {
            tracing::warn!("Invalid client ID for removal");
            return;
        }

        self.registry.remove(client_id).await;
        self.tracking.clear(client_id).await;
        tracing::info!(client = %client_id, "Client removed and history cleared");
    }

    // ---- message sending ----

    /// Send the canned frame for an opcode to one client
    pub async fn send_message(&self, client_id: &str, opcode: u8) -> Result<()> {
        self.validate_client_for_send(client_id).await?;
        Self::validate_opcode(opcode)?;

        let frame = build_frame(opcode)?;
        self.sender.send(client_id, &frame).await?;
        self.tracking.record(client_id, opcode).await;
        self.total_messages_sent.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            client = %client_id,
            opcode = %format_opcode(opcode),
            "Message sent"
        );
        Ok(())
    }

    /// Send raw bytes to one client
    pub async fn send_bytes(&self, client_id: &str, data: &[u8]) -> Result<()> {
        self.validate_client_for_send(client_id).await?;
        if data.is_empty() {
            return Err(GatewayError::InvalidArgument(
                "message data cannot be empty".into(),
            ));
        }

        self.sender.send(client_id, data).await?;
        self.total_messages_sent.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(client = %client_id, bytes = data.len(), "Custom message sent");
        Ok(())
    }

    /// Broadcast the canned frame for an opcode to all active clients
    ///
    /// A failure for one client never aborts the others; returns the number
    /// of successful sends.
    pub async fn broadcast_message(&self, opcode: u8) -> Result<usize> {
        Self::validate_opcode(opcode)?;

        let targets = self.registry.active_ids().await;
        if targets.is_empty() {
            tracing::debug!("No active clients for broadcast");
            return Ok(0);
        }

        let frame = build_frame(opcode)?;
        let mut successes = 0;

        for client_id in &targets {
            match self.sender.send(client_id, &frame).await {
                Ok(()) => {
                    self.tracking.record(client_id, opcode).await;
                    successes += 1;
                }
                Err(e) => {
                    tracing::warn!(client = %client_id, error = %e, "Failed to send broadcast");
                }
            }
        }

        self.total_broadcasts_sent.fetch_add(1, Ordering::Relaxed);
        self.total_messages_sent
            .fetch_add(successes as u64, Ordering::Relaxed);

        tracing::info!(
            sent = successes,
            targets = targets.len(),
            opcode = %format_opcode(opcode),
            "Broadcast sent"
        );
        Ok(successes)
    }

    /// Send the canned frame for an opcode to a group of clients
    ///
    /// Inactive members of the group are skipped, not errored.
    pub async fn send_message_to_group(
        &self,
        client_ids: &HashSet<String>,
        opcode: u8,
    ) -> Result<usize> {
        Self::validate_opcode(opcode)?;

        if client_ids.is_empty() {
            tracing::warn!("Empty client group provided");
            return Ok(0);
        }

        let frame = build_frame(opcode)?;
        let mut successes = 0;

        for client_id in client_ids {
            if !self.registry.is_active(client_id).await {
                tracing::debug!(client = %client_id, "Skipping inactive client in group");
                continue;
            }

            match self.sender.send(client_id, &frame).await {
                Ok(()) => {
                    self.tracking.record(client_id, opcode).await;
                    successes += 1;
                }
                Err(e) => {
                    tracing::warn!(client = %client_id, error = %e, "Failed to send group message");
                }
            }
        }

        self.total_group_messages_sent.fetch_add(1, Ordering::Relaxed);
        self.total_messages_sent
            .fetch_add(successes as u64, Ordering::Relaxed);

        tracing::info!(
            sent = successes,
            targets = client_ids.len(),
            opcode = %format_opcode(opcode),
            "Group message sent"
        );
        Ok(successes)
    }

    // ---- statistics and monitoring ----

    /// Registry-wide connection statistics
    pub async fn connection_statistics(&self) -> ConnectionStatistics {
        self.registry.statistics().await
    }

    /// Outbound messaging statistics
    pub async fn communication_stats(&self) -> CommsStats {
        CommsStats {
            total_messages_sent: self.total_messages_sent.load(Ordering::Relaxed),
            total_broadcasts_sent: self.total_broadcasts_sent.load(Ordering::Relaxed),
            total_group_messages_sent: self.total_group_messages_sent.load(Ordering::Relaxed),
            active_connections: self.registry.active_count().await,
        }
    }

    /// Per-client last transmitted opcode snapshot
    pub async fn transmission_history(&self) -> HashMap<String, u8> {
        self.tracking.history().await
    }

    /// Last opcode sent to the client
    pub async fn last_transmitted_opcode(&self, client_id: &str) -> Option<u8> {
        self.tracking.last_opcode(client_id).await
    }

    /// Opcodes the frame builder accepts
    pub fn supported_opcodes(&self) -> &'static [u8] {
        &SUPPORTED_OPCODES
    }

    // ---- validation ----

    async fn validate_client_for_send(&self, client_id: &str) -> Result<()> {
        if client_id.trim().is_empty() {
            return Err(GatewayError::InvalidArgument(
                "client id cannot be empty".into(),
            ));
        }
        if !self.registry.is_active(client_id).await {
            return Err(GatewayError::ClientNotActive(client_id.to_string()));
        }
        Ok(())
    }

    fn validate_opcode(opcode: u8) -> Result<()> {
        if !is_opcode_supported(opcode) {
            return Err(GatewayError::UnsupportedOpcode(opcode));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::{OP_STATUS_REQUEST, STATUS_REQUEST_FRAME};
    use crate::registry::ConnWriter;

    fn addr(port: u16) -> std::net::SocketAddr {
        format!("10.1.1.20:{}", port).parse().unwrap()
    }

    fn sink_writer() -> ConnWriter {
        Box::new(tokio::io::sink())
    }

    fn service(registry: &Arc<ConnectionRegistry>) -> CommsService {
        let sender = Arc::new(MessageSender::new(Arc::clone(registry)));
        CommsService::new(
            Arc::clone(registry),
            sender,
            Arc::new(TransmissionLog::new()),
        )
    }

    #[tokio::test]
    async fn test_send_message_records_history() {
        let registry = Arc::new(ConnectionRegistry::new());
        registry
            .add("10.1.1.20", addr(50000), sink_writer())
            .await
            .unwrap();

        let service = service(&registry);
        service.send_message("10.1.1.20", OP_STATUS_REQUEST).await.unwrap();

        assert_eq!(
            service.last_transmitted_opcode("10.1.1.20").await,
            Some(OP_STATUS_REQUEST)
        );
        assert_eq!(service.communication_stats().await.total_messages_sent, 1);
    }

    #[tokio::test]
    async fn test_send_message_rejects_inactive_client() {
        let registry = Arc::new(ConnectionRegistry::new());
        let service = service(&registry);

        let result = service.send_message("10.1.1.99", OP_STATUS_REQUEST).await;
        assert!(matches!(result, Err(GatewayError::ClientNotActive(_))));
    }

    #[tokio::test]
    async fn test_send_message_rejects_blank_id() {
        let registry = Arc::new(ConnectionRegistry::new());
        let service = service(&registry);

        let result = service.send_message("  ", OP_STATUS_REQUEST).await;
        assert!(matches!(result, Err(GatewayError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_send_message_rejects_unsupported_opcode() {
        let registry = Arc::new(ConnectionRegistry::new());
        registry
            .add("10.1.1.20", addr(50000), sink_writer())
            .await
            .unwrap();

        let service = service(&registry);
        let result = service.send_message("10.1.1.20", 0x55).await;
        assert!(matches!(result, Err(GatewayError::UnsupportedOpcode(0x55))));
    }

    #[tokio::test]
    async fn test_send_bytes_rejects_empty_data() {
        let registry = Arc::new(ConnectionRegistry::new());
        registry
            .add("10.1.1.20", addr(50000), sink_writer())
            .await
            .unwrap();

        let service = service(&registry);
        let result = service.send_bytes("10.1.1.20", &[]).await;
        assert!(matches!(result, Err(GatewayError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_broadcast_counts_successes() {
        let registry = Arc::new(ConnectionRegistry::new());
        registry
            .add("10.1.1.20", addr(50000), sink_writer())
            .await
            .unwrap();
        registry
            .add("10.1.1.21", addr(50001), sink_writer())
            .await
            .unwrap();

        let service = service(&registry);
        let sent = service.broadcast_message(OP_STATUS_REQUEST).await.unwrap();

        assert_eq!(sent, 2);
        let stats = service.communication_stats().await;
        assert_eq!(stats.total_broadcasts_sent, 1);
        assert_eq!(stats.total_messages_sent, 2);
    }

    #[tokio::test]
    async fn test_broadcast_without_clients() {
        let registry = Arc::new(ConnectionRegistry::new());
        let service = service(&registry);
        assert_eq!(service.broadcast_message(OP_STATUS_REQUEST).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_group_send_skips_inactive() {
        let registry = Arc::new(ConnectionRegistry::new());
        registry
            .add("10.1.1.20", addr(50000), sink_writer())
            .await
            .unwrap();

        let service = service(&registry);
        let group: HashSet<String> = ["10.1.1.20".to_string(), "10.1.1.99".to_string()]
            .into_iter()
            .collect();

        let sent = service
            .send_message_to_group(&group, OP_STATUS_REQUEST)
            .await
            .unwrap();
        assert_eq!(sent, 1);
        assert_eq!(
            service.communication_stats().await.total_group_messages_sent,
            1
        );
    }

    #[tokio::test]
    async fn test_remove_client_clears_history() {
        let registry = Arc::new(ConnectionRegistry::new());
        registry
            .add("10.1.1.20", addr(50000), sink_writer())
            .await
            .unwrap();

        let service = service(&registry);
        service.send_message("10.1.1.20", OP_STATUS_REQUEST).await.unwrap();
        service.remove_client("10.1.1.20").await;

        assert!(!service.is_client_active("10.1.1.20").await);
        assert_eq!(service.last_transmitted_opcode("10.1.1.20").await, None);
    }

    #[tokio::test]
    async fn test_supported_opcodes() {
        let registry = Arc::new(ConnectionRegistry::new());
        let service = service(&registry);

        let opcodes = service.supported_opcodes();
        assert!(opcodes.contains(&OP_STATUS_REQUEST));
        assert!(opcodes.contains(&0xA2));
    }

    #[tokio::test]
    async fn test_sent_frame_reaches_wire() {
        use tokio::io::AsyncReadExt;

        let registry = Arc::new(ConnectionRegistry::new());
        let (client, device_side) = tokio::io::duplex(64);
        registry
            .add("10.1.1.20", addr(50000), Box::new(client))
            .await
            .unwrap();

        let service = service(&registry);
        service.send_message("10.1.1.20", OP_STATUS_REQUEST).await.unwrap();

        let mut reader = device_side;
        let mut buf = [0u8; 10];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, STATUS_REQUEST_FRAME);
    }
}
