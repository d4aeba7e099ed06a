//! Statistics snapshot types for the gateway

/// Registry-wide connection statistics
#[derive(Debug, Clone, Default)]
pub struct ConnectionStatistics {
    /// Connections currently active
    pub active_connections: usize,
    /// Entries currently in the registry (active or not)
    pub current_connections: usize,
    /// Connections ever registered
    pub total_connections: u64,
    /// Active / total, as a percentage
    pub connection_success_rate: f64,
}

impl std::fmt::Display for ConnectionStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConnectionStatistics{{active={}, current={}, total={}, successRate={:.2}%}}",
            self.active_connections,
            self.current_connections,
            self.total_connections,
            self.connection_success_rate
        )
    }
}

/// Outbound messaging statistics
#[derive(Debug, Clone, Default)]
pub struct CommsStats {
    /// Individual messages delivered
    pub total_messages_sent: u64,
    /// Broadcast operations performed
    pub total_broadcasts_sent: u64,
    /// Group-send operations performed
    pub total_group_messages_sent: u64,
    /// Active connections at snapshot time
    pub active_connections: usize,
}

impl CommsStats {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_statistics_display() {
        let stats = ConnectionStatistics {
            active_connections: 2,
            current_connections: 3,
            total_connections: 4,
            connection_success_rate: 50.0,
        };

        assert_eq!(
            stats.to_string(),
            "ConnectionStatistics{active=2, current=3, total=4, successRate=50.00%}"
        );
    }

    #[test]
    fn test_comms_stats_new() {
        let stats = CommsStats::new();
        assert_eq!(stats.total_messages_sent, 0);
        assert_eq!(stats.total_broadcasts_sent, 0);
        assert_eq!(stats.total_group_messages_sent, 0);
        assert_eq!(stats.active_connections, 0);
    }

}
