//! Inbound message dispatch
//!
//! Consumes raw byte occurrences from the event loop on a bounded, sharded
//! worker pool, runs them through the codec and routes the classified result
//! to registered handlers and the external sink.

pub mod dispatcher;
pub mod handler;

pub use dispatcher::{Dispatcher, RawEvent};
pub use handler::{HandlerTable, MessageHandler};
