//! Inbound dispatch worker pool
//!
//! Raw byte occurrences from the event loop are validated, parsed, classified
//! and routed off the loop thread. The pool is sharded by client id so frames
//! from one device are processed in arrival order while a slow handler for
//! one device cannot stall the others. Each shard queue is bounded; when a
//! queue is full the event is dropped with a warning rather than growing
//! without limit.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::protocol::{self, FrameValidator, InboundMessage};
use crate::sink::DataSink;

use super::handler::HandlerTable;

/// One raw read occurrence published by the event loop
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub client_id: String,
    pub data: Bytes,
}

/// Routes validated, classified messages to handlers and the external sink
pub struct Dispatcher {
    shards: Vec<mpsc::Sender<RawEvent>>,
    handlers: Arc<HandlerTable>,
}

impl Dispatcher {
    /// Spawn the worker pool
    pub fn new(
        validator: Arc<FrameValidator>,
        sink: Arc<dyn DataSink>,
        handlers: Arc<HandlerTable>,
        workers: usize,
        queue_depth: usize,
    ) -> Self {
        let workers = workers.max(1);
        let mut shards = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let (tx, mut rx) = mpsc::channel::<RawEvent>(queue_depth.max(1));
            let validator = Arc::clone(&validator);
            let sink = Arc::clone(&sink);
            let handlers = Arc::clone(&handlers);

            tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    Self::process(&validator, &sink, &handlers, event).await;
                }
                tracing::debug!(worker = worker_id, "Dispatch worker stopped");
            });

            shards.push(tx);
        }

        Self { shards, handlers }
    }

    /// Handler table shared with the workers
    pub fn handlers(&self) -> &Arc<HandlerTable> {
        &self.handlers
    }

    /// Publish a raw read occurrence
    ///
    /// Never blocks the event loop: a full shard queue drops the event with
    /// a warning.
    pub fn submit(&self, event: RawEvent) {
        let shard = self.shard_for(&event.client_id);

        match self.shards[shard].try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    client = %event.client_id,
                    shard = shard,
                    "Dispatch queue full, dropping frame"
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::warn!(
                    client = %event.client_id,
                    "Dispatcher stopped, dropping frame"
                );
            }
        }
    }

    fn shard_for(&self, client_id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        client_id.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    async fn process(
        validator: &FrameValidator,
        sink: &Arc<dyn DataSink>,
        handlers: &HandlerTable,
        event: RawEvent,
    ) {
        let outcome = validator.validate(&event.client_id, &event.data);
        if let Some(reason) = outcome.reason() {
            tracing::warn!(
                client = %event.client_id,
                reason = %reason,
                "Message validation failed, frame dropped"
            );
            return;
        }

        let parsed = match protocol::parse(&event.data) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(client = %event.client_id, error = %e, "Frame parse failed");
                return;
            }
        };

        let message = InboundMessage::new(event.client_id, parsed.opcode, parsed.payload);
        tracing::debug!(message = %message, "Message processed");

        // Forward to the backend without holding up handler execution
        {
            let sink = Arc::clone(sink);
            let client_id = message.client_id.clone();
            let msg_type = message.msg_type;
            let payload = message.payload.clone();

            tokio::spawn(async move {
                if let Err(e) = sink.forward(&client_id, msg_type, payload).await {
                    tracing::error!(client = %client_id, error = %e, "Sink forward failed");
                }
            });
        }

        handlers.dispatch(&message).await;
    }
}
