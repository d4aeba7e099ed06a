//! Connection registry
//!
//! Owns the set of live device connections keyed by client id (the remote IP
//! address) and tracks per-connection activity and statistics. All other
//! components hold only a lookup key; the registry controls every
//! connection's lifecycle from admission to teardown.
//!
//! ```text
//!                      Arc<ConnectionRegistry>
//!                 ┌──────────────────────────────┐
//!                 │ connections: HashMap<id,     │
//!                 │   Arc<ClientConnection> {    │
//!                 │     writer: Mutex<_>,        │
//!                 │     activity, counters,      │
//!                 │   }                          │
//!                 │ >                            │
//!                 └──────────────┬───────────────┘
//!                                │
//!          ┌─────────────────────┼─────────────────────┐
//!          ▼                     ▼                     ▼
//!     [Event loop]          [Send path]            [Sweeper]
//!     add/touch/remove      write via Mutex        sweep_timeouts()
//! ```

pub mod connection;
pub mod error;
pub mod store;

pub use connection::{ClientConnection, ConnWriter, ConnectionStatus};
pub use error::RegistryError;
pub use store::ConnectionRegistry;
