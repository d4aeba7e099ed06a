//! HTTP relay sink
//!
//! Posts classified payloads to the backend system as JSON. The payload data
//! travels hex-encoded; the device address rides along in the `X-TSC-IP`
//! header for upstream routing.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::error::{GatewayError, Result};
use crate::protocol::MessageType;

use super::DataSink;

/// Configuration for the HTTP relay
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    /// Backend base URL
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Disabled sinks skip transmission entirely
    pub enabled: bool,
}

impl Default for HttpSinkConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8115".to_string(),
            timeout: Duration::from_millis(5000),
            enabled: true,
        }
    }
}

/// JSON body posted to the backend
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DataPayload<'a> {
    client_id: &'a str,
    #[serde(rename = "type")]
    msg_type: &'static str,
    /// Hex-encoded payload bytes
    data: String,
    /// Milliseconds since the Unix epoch
    timestamp: u128,
    data_length: usize,
}

/// Sink that relays payloads to the backend over HTTP
pub struct HttpSink {
    config: HttpSinkConfig,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(config: HttpSinkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Sink(format!("HTTP client build: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Probe the backend health endpoint
    pub async fn test_connection(&self) -> bool {
        if !self.config.enabled {
            return false;
        }

        let url = format!("{}/health", self.config.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, "Connection test failed");
                false
            }
        }
    }

    pub fn config(&self) -> &HttpSinkConfig {
        &self.config
    }

    fn encode_hex(payload: &[u8]) -> String {
        payload.iter().map(|b| format!("{:02X}", b)).collect()
    }
}

#[async_trait]
impl DataSink for HttpSink {
    async fn forward(&self, client_id: &str, msg_type: MessageType, payload: Bytes) -> Result<()> {
        if !self.config.enabled {
            tracing::debug!("External API is disabled, skipping data transmission");
            return Ok(());
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();

        let body = DataPayload {
            client_id,
            msg_type: msg_type.name(),
            data: Self::encode_hex(&payload),
            timestamp,
            data_length: payload.len(),
        };

        let url = format!("{}/api/v1/resp-0x12", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .header("X-TSC-IP", client_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Sink(format!("backend request failed: {}", e)))?;

        if response.status().is_success() {
            tracing::debug!(
                client = %client_id,
                bytes = payload.len(),
                "Data sent successfully"
            );
            Ok(())
        } else {
            Err(GatewayError::Sink(format!(
                "unexpected backend response: {}",
                response.status()
            )))
        }
    }
}
