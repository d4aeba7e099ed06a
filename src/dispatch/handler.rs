//! Message handler table
//!
//! Handlers are plain functions keyed by message type. A handler that panics
//! is isolated per message: the panic is caught and logged, other in-flight
//! messages and the owning worker are unaffected.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::protocol::{InboundMessage, MessageType};

/// Handler callback for one classified message
pub type MessageHandler = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// Lookup table routing classified messages to handlers
pub struct HandlerTable {
    handlers: RwLock<HashMap<MessageType, MessageHandler>>,
}

impl HandlerTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a table preloaded with logging stubs for the known types
    pub fn with_defaults() -> Self {
        let stub: MessageHandler = Arc::new(|message: &InboundMessage| {
            tracing::debug!(
                client = %message.client_id,
                msg_type = %message.msg_type,
                "Handling message"
            );
        });

        let mut handlers: HashMap<MessageType, MessageHandler> = HashMap::new();
        for msg_type in [
            MessageType::IntersectionStatus,
            MessageType::DetectorInfo,
            MessageType::PhaseInfo,
            MessageType::UserRequest,
        ] {
            handlers.insert(msg_type, Arc::clone(&stub));
        }

        tracing::info!("Default message handlers initialized");
        Self {
            handlers: RwLock::new(handlers),
        }
    }

    /// Register (or replace) the handler for a message type
    pub async fn register<F>(&self, msg_type: MessageType, handler: F)
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.handlers.write().await.insert(msg_type, Arc::new(handler));
        tracing::info!(msg_type = %msg_type, "Handler registered");
    }

    /// Remove the handler for a message type
    pub async fn unregister(&self, msg_type: MessageType) {
        if self.handlers.write().await.remove(&msg_type).is_some() {
            tracing::info!(msg_type = %msg_type, "Handler unregistered");
        }
    }

    /// Run the registered handler for the message, if any
    pub async fn dispatch(&self, message: &InboundMessage) {
        let handler = {
            let handlers = self.handlers.read().await;
            handlers.get(&message.msg_type).cloned()
        };

        match handler {
            Some(handler) => {
                let result = catch_unwind(AssertUnwindSafe(|| handler(message)));
                match result {
                    Ok(()) => {
                        tracing::debug!(
                            msg_type = %message.msg_type,
                            client = %message.client_id,
                            "Message dispatched"
                        );
                    }
                    Err(_) => {
                        tracing::error!(
                            msg_type = %message.msg_type,
                            client = %message.client_id,
                            "Handler panicked while dispatching message"
                        );
                    }
                }
            }
            None => {
                tracing::warn!(
                    msg_type = %message.msg_type,
                    client = %message.client_id,
                    opcode = %message.opcode_hex(),
                    "No handler found for message type"
                );
            }
        }
    }

    /// Number of registered handlers
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }

    /// Message types with a registered handler
    pub async fn registered_types(&self) -> Vec<MessageType> {
        self.handlers.read().await.keys().copied().collect()
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}
