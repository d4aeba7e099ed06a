//! TCP gateway for traffic-signal controllers
//!
//! Bridges field devices speaking a fixed binary framing protocol to a
//! backend HTTP consumer:
//!
//! - accepts concurrent device connections with IP-based admission control
//! - validates, classifies and dispatches inbound frames to handlers and an
//!   external sink
//! - pushes opcode-addressed commands back to one, some or all devices
//! - polls every connected device for status on a fixed interval
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tsc_gateway::admission::MemoryAllowlist;
//! use tsc_gateway::{GatewayConfig, GatewayServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let allowlist = MemoryAllowlist::with_addresses(["10.1.1.20"]).await;
//!
//!     let server = GatewayServer::new(GatewayConfig::default())
//!         .allowlist(Arc::new(allowlist));
//!
//!     server.run_until(async {
//!         tokio::signal::ctrl_c().await.ok();
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```

pub mod admission;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod service;
pub mod sink;
pub mod stats;
pub mod transport;

pub use error::{GatewayError, Result};
pub use protocol::{InboundMessage, MessageCategory, MessageType};
pub use registry::ConnectionRegistry;
pub use server::{GatewayConfig, GatewayServer, ServerState};
pub use service::CommsService;
