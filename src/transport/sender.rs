//! Outbound send path
//!
//! Writes are serialized per connection by the connection's write mutex, so
//! two concurrent sends can never interleave frames on one socket. A write
//! failure tears the connection down; broadcast and group sends treat each
//! target independently.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{GatewayError, Result};
use crate::registry::ConnectionRegistry;

/// Sends raw frames to registered connections
pub struct MessageSender {
    registry: Arc<ConnectionRegistry>,
}

impl MessageSender {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Send a frame to one client
    ///
    /// Skips with a log entry when the connection is not active (scheduled
    /// traffic races disconnects, so this is not an error). A write failure
    /// force-closes the connection, removes it from the registry and returns
    /// `SendFailed`.
    pub async fn send(&self, client_id: &str, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            tracing::warn!(client = %client_id, "Attempted to send empty message");
            return Err(GatewayError::InvalidArgument(
                "message data cannot be empty".into(),
            ));
        }

        let connection = match self.registry.get(client_id).await {
            Some(connection) if connection.is_active() => connection,
            _ => {
                tracing::debug!(client = %client_id, "Skipping message send to inactive client");
                return Ok(());
            }
        };

        match connection.write(data).await {
            Ok(()) => {
                connection.add_bytes_sent(data.len() as u64);
                connection.increment_message_count();
                tracing::debug!(client = %client_id, bytes = data.len(), "Message sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(client = %client_id, error = %e, "Error sending message");
                self.registry.remove_if_current(&connection).await;
                Err(GatewayError::SendFailed {
                    client_id: client_id.to_string(),
                    source: e,
                })
            }
        }
    }

    /// Send a frame to every active client; returns the number of successes
    ///
    /// A failure for one target never aborts the others.
    pub async fn send_to_all(&self, data: &[u8]) -> usize {
        let targets = self.registry.active_ids().await;
        if targets.is_empty() {
            tracing::debug!("No active clients to send message to");
            return 0;
        }

        tracing::debug!(count = targets.len(), "Broadcasting message to active clients");

        let mut successes = 0;
        for client_id in &targets {
            match self.send(client_id, data).await {
                Ok(()) => successes += 1,
                Err(e) => {
                    tracing::warn!(client = %client_id, error = %e, "Failed to send broadcast");
                }
            }
        }

        successes
    }

    /// Send a frame to the active clients within the given set
    ///
    /// Inactive members are skipped, not errored. Returns the number of
    /// successes.
    pub async fn send_to_group(&self, client_ids: &HashSet<String>, data: &[u8]) -> usize {
        if client_ids.is_empty() {
            tracing::debug!("No client IDs specified for group send");
            return 0;
        }

        let mut successes = 0;
        for client_id in client_ids {
            if !self.registry.is_active(client_id).await {
                tracing::debug!(client = %client_id, "Skipping inactive client in group");
                continue;
            }

            match self.send(client_id, data).await {
                Ok(()) => successes += 1,
                Err(e) => {
                    tracing::warn!(client = %client_id, error = %e, "Failed to send group message");
                }
            }
        }

        successes
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use tokio::io::AsyncWrite;

    use super::*;
    use crate::registry::ConnWriter;

    /// Writer whose writes always fail
    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn addr(port: u16) -> std::net::SocketAddr {
        format!("10.1.1.20:{}", port).parse().unwrap()
    }

    fn sink_writer() -> ConnWriter {
        Box::new(tokio::io::sink())
    }

    #[tokio::test]
    async fn test_send_to_unknown_client_is_a_skip() {
        let registry = Arc::new(ConnectionRegistry::new());
        let sender = MessageSender::new(registry);

        assert!(sender.send("10.1.1.99", &[0x01]).await.is_ok());
    }

    #[tokio::test]
    async fn test_send_empty_data_rejected() {
        let registry = Arc::new(ConnectionRegistry::new());
        let sender = MessageSender::new(registry);

        let result = sender.send("10.1.1.20", &[]).await;
        assert!(matches!(result, Err(GatewayError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_send_updates_counters() {
        let registry = Arc::new(ConnectionRegistry::new());
        let connection = registry
            .add("10.1.1.20", addr(50000), sink_writer())
            .await
            .unwrap();

        let sender = MessageSender::new(Arc::clone(&registry));
        sender.send("10.1.1.20", &[0x01, 0x02]).await.unwrap();

        let status = connection.status();
        assert_eq!(status.bytes_sent, 2);
        assert_eq!(status.message_count, 1);
    }

    #[tokio::test]
    async fn test_send_failure_tears_down_connection() {
        let registry = Arc::new(ConnectionRegistry::new());
        registry
            .add("10.1.1.20", addr(50000), Box::new(BrokenWriter))
            .await
            .unwrap();

        let sender = MessageSender::new(Arc::clone(&registry));
        let result = sender.send("10.1.1.20", &[0x01]).await;

        assert!(matches!(result, Err(GatewayError::SendFailed { .. })));
        assert_eq!(registry.current_count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_partial_failure_isolation() {
        let registry = Arc::new(ConnectionRegistry::new());
        registry
            .add("10.1.1.20", addr(50000), sink_writer())
            .await
            .unwrap();
        registry
            .add("10.1.1.21", addr(50001), Box::new(BrokenWriter))
            .await
            .unwrap();
        registry
            .add("10.1.1.22", addr(50002), sink_writer())
            .await
            .unwrap();

        let sender = MessageSender::new(Arc::clone(&registry));
        let successes = sender.send_to_all(&[0x01]).await;

        // The broken client fails, the other two still go through
        assert_eq!(successes, 2);
        assert_eq!(registry.current_count().await, 2);
    }

    #[tokio::test]
    async fn test_group_send_skips_inactive_members() {
        let registry = Arc::new(ConnectionRegistry::new());
        registry
            .add("10.1.1.20", addr(50000), sink_writer())
            .await
            .unwrap();

        let sender = MessageSender::new(Arc::clone(&registry));
        let group: HashSet<String> = ["10.1.1.20".to_string(), "10.1.1.99".to_string()]
            .into_iter()
            .collect();

        let successes = sender.send_to_group(&group, &[0x01]).await;
        assert_eq!(successes, 1);
    }
}
