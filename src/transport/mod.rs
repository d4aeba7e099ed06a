//! Outbound send path
//!
//! Unicast, group and broadcast sends with per-socket write serialization,
//! transmission history, and the scheduled status poller.

pub mod poller;
pub mod sender;
pub mod tracking;

pub use poller::StatusPoller;
pub use sender::MessageSender;
pub use tracking::TransmissionLog;
