//! Statistics and monitoring snapshots

pub mod metrics;

pub use metrics::{CommsStats, ConnectionStatistics};
