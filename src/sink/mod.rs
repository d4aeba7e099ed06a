//! External data sink
//!
//! Classified inbound payloads are forwarded to a backend consumer. The
//! dispatcher treats the sink as best-effort: failures are logged, never
//! retried, and never affect the device connection.

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::protocol::MessageType;

pub use http::{HttpSink, HttpSinkConfig};

/// Consumes classified payloads from the dispatcher
#[async_trait]
pub trait DataSink: Send + Sync {
    /// Forward one classified payload to the backend
    async fn forward(&self, client_id: &str, msg_type: MessageType, payload: Bytes) -> Result<()>;
}

/// Sink that logs and discards everything
///
/// Default when no backend is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl DataSink for NullSink {
    async fn forward(&self, client_id: &str, msg_type: MessageType, payload: Bytes) -> Result<()> {
        tracing::debug!(
            client = %client_id,
            msg_type = %msg_type,
            bytes = payload.len(),
            "Sink disabled, payload discarded"
        );
        Ok(())
    }
}
