//! Gateway server configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Per-connection scratch buffer for socket reads
    pub read_buffer_size: usize,

    /// Disconnect a device after this much inactivity
    pub idle_timeout: Duration,

    /// How often the timeout sweep runs
    pub sweep_interval: Duration,

    /// Status-request poll interval
    pub poll_interval: Duration,

    /// Dispatch worker count
    pub dispatch_workers: usize,

    /// Bounded queue depth per dispatch worker
    pub dispatch_queue_depth: usize,

    /// Grace period for in-flight work during shutdown
    pub shutdown_grace: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:7070".parse().unwrap(),
            max_connections: 100,
            read_buffer_size: 8192,
            idle_timeout: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
            dispatch_workers: 4,
            dispatch_queue_depth: 64,
            shutdown_grace: Duration::from_secs(5),
            tcp_nodelay: true,
        }
    }
}

impl GatewayConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections (0 = unlimited)
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the status poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the dispatch worker count
    pub fn dispatch_workers(mut self, workers: usize) -> Self {
        self.dispatch_workers = workers.max(1);
        self
    }

    /// Set the read buffer size
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(512);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();

        assert_eq!(config.bind_addr.port(), 7070);
        assert_eq!(config.max_connections, 100);
        assert_eq!(config.read_buffer_size, 8192);
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert!(config.tcp_nodelay);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:7071".parse().unwrap();
        let config = GatewayConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 7071);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:7070".parse().unwrap();
        let config = GatewayConfig::default()
            .bind(addr)
            .max_connections(50)
            .idle_timeout(Duration::from_secs(30))
            .poll_interval(Duration::from_millis(500))
            .dispatch_workers(8);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.dispatch_workers, 8);
    }

    #[test]
    fn test_builder_floors() {
        let config = GatewayConfig::default()
            .dispatch_workers(0)
            .read_buffer_size(16);

        assert_eq!(config.dispatch_workers, 1);
        assert_eq!(config.read_buffer_size, 512);
    }
}
