//! Scheduled status poller
//!
//! Sends the canned status-request frame to every connected device on a
//! fixed interval. The target list is a fresh registry snapshot each tick,
//! so a device whose send fails (and is therefore torn down) drops out of
//! the schedule on the next tick.

use std::sync::Arc;
use std::time::Duration;

use crate::protocol::{build_frame, constants::OP_STATUS_REQUEST};
use crate::registry::ConnectionRegistry;

use super::sender::MessageSender;

/// Periodic status-request poll over all active connections
pub struct StatusPoller;

impl StatusPoller {
    /// Spawn the poll task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn(
        registry: Arc<ConnectionRegistry>,
        sender: Arc<MessageSender>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            tracing::info!(interval_ms = interval.as_millis() as u64, "Status request scheduler started");

            loop {
                ticker.tick().await;
                Self::poll_once(&registry, &sender).await;
            }
        })
    }

    async fn poll_once(registry: &ConnectionRegistry, sender: &MessageSender) {
        let active = registry.active_count().await;
        if active == 0 {
            return;
        }

        let frame = match build_frame(OP_STATUS_REQUEST) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Error building status request");
                return;
            }
        };

        let sent = sender.send_to_all(&frame).await;
        tracing::debug!(sent = sent, active = active, "Status request sent to active clients");
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::protocol::constants::STATUS_REQUEST_FRAME;

    #[tokio::test]
    async fn test_poller_sends_status_requests() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (client, server) = tokio::io::duplex(256);
        registry
            .add("10.1.1.20", "10.1.1.20:50000".parse().unwrap(), Box::new(client))
            .await
            .unwrap();

        let sender = Arc::new(MessageSender::new(Arc::clone(&registry)));
        let handle = StatusPoller::spawn(
            Arc::clone(&registry),
            sender,
            Duration::from_millis(20),
        );

        // The device side should observe at least one canned frame
        let mut reader = server;
        let mut buf = [0u8; 10];
        tokio::time::timeout(Duration::from_secs(1), reader.read_exact(&mut buf))
            .await
            .expect("poll frame should arrive")
            .unwrap();
        assert_eq!(buf, STATUS_REQUEST_FRAME);

        handle.abort();
    }

    #[tokio::test]
    async fn test_poller_idles_without_clients() {
        let registry = Arc::new(ConnectionRegistry::new());
        let sender = Arc::new(MessageSender::new(Arc::clone(&registry)));

        // No clients: one poll cycle is a no-op and must not panic
        StatusPoller::poll_once(&registry, &sender).await;
    }
}
