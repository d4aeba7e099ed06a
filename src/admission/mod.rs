//! IP-based admission control
//!
//! New connections are accepted or rejected by remote address before any
//! registry interaction. The allow-list itself is an injected collaborator;
//! this module carries the decision logic and an in-memory provider.

pub mod control;
pub mod provider;

pub use control::AdmissionControl;
pub use provider::{AdmissionEntry, AllowlistProvider, MemoryAllowlist};
