//! Outbound transmission history
//!
//! Tracks the last opcode sent to each client, used by the operational API
//! to show what a device was last asked for.

use std::collections::HashMap;
use std::time::SystemTime;

use tokio::sync::RwLock;

use crate::protocol::format_opcode;

#[derive(Debug, Clone, Copy)]
struct TransmissionRecord {
    opcode: u8,
    at: SystemTime,
}

/// Per-client record of the last transmitted opcode
pub struct TransmissionLog {
    records: RwLock<HashMap<String, TransmissionRecord>>,
}

impl TransmissionLog {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Record a transmission to a client
    pub async fn record(&self, client_id: &str, opcode: u8) {
        let record = TransmissionRecord {
            opcode,
            at: SystemTime::now(),
        };
        self.records
            .write()
            .await
            .insert(client_id.to_string(), record);
        tracing::debug!(
            client = %client_id,
            opcode = %format_opcode(opcode),
            "Recorded transmission"
        );
    }

    /// Last opcode sent to the client, if any
    pub async fn last_opcode(&self, client_id: &str) -> Option<u8> {
        self.records.read().await.get(client_id).map(|r| r.opcode)
    }

    /// When the client was last sent a message
    pub async fn last_time(&self, client_id: &str) -> Option<SystemTime> {
        self.records.read().await.get(client_id).map(|r| r.at)
    }

    /// Snapshot of every client's last opcode
    pub async fn history(&self) -> HashMap<String, u8> {
        self.records
            .read()
            .await
            .iter()
            .map(|(id, r)| (id.clone(), r.opcode))
            .collect()
    }

    /// Drop the history for a client
    pub async fn clear(&self, client_id: &str) {
        if self.records.write().await.remove(client_id).is_some() {
            tracing::debug!(client = %client_id, "Cleared transmission history");
        }
    }
}

impl Default for TransmissionLog {
    fn default() -> Self {
        Self::new()
    }
}
