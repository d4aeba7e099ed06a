//! End-to-end gateway scenarios over loopback sockets

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use tsc_gateway::admission::MemoryAllowlist;
use tsc_gateway::protocol::constants::STATUS_REQUEST_FRAME;
use tsc_gateway::protocol::MessageType;
use tsc_gateway::sink::DataSink;
use tsc_gateway::{GatewayConfig, GatewayServer, Result, ServerState};

/// Sink that records every forwarded payload
struct RecordingSink {
    forwarded: Mutex<Vec<(String, MessageType, Bytes)>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            forwarded: Mutex::new(Vec::new()),
        })
    }

    async fn count(&self) -> usize {
        self.forwarded.lock().await.len()
    }
}

#[async_trait]
impl DataSink for RecordingSink {
    async fn forward(&self, client_id: &str, msg_type: MessageType, payload: Bytes) -> Result<()> {
        self.forwarded
            .lock()
            .await
            .push((client_id.to_string(), msg_type, payload));
        Ok(())
    }
}

fn test_config() -> GatewayConfig {
    GatewayConfig::with_addr("127.0.0.1:0".parse().unwrap())
        // Keep scheduled traffic quiet unless a test wants it
        .poll_interval(Duration::from_secs(600))
        .sweep_interval(Duration::from_secs(600))
}

async fn start(server: Arc<GatewayServer>) -> tokio::task::JoinHandle<Result<()>> {
    server.bind().await.unwrap();
    let runner = Arc::clone(&server);
    let handle = tokio::spawn(async move { runner.run().await });

    while server.state() != ServerState::Running {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    handle
}

async fn wait_for<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if condition().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn admitted_device_round_trip() {
    let sink = RecordingSink::new();
    let allowlist = MemoryAllowlist::with_addresses(["127.0.0.1"]).await;

    let server = Arc::new(
        GatewayServer::new(test_config())
            .allowlist(Arc::new(allowlist))
            .sink(Arc::clone(&sink) as Arc<dyn DataSink>),
    );
    let handle = start(Arc::clone(&server)).await;

    let mut device = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();

    // The registry gains exactly one active entry for the address
    let registry = Arc::clone(server.registry());
    wait_for(|| {
        let registry = Arc::clone(&registry);
        async move { registry.is_active("127.0.0.1").await }
    })
    .await;
    assert_eq!(server.registry().active_count().await, 1);

    // Device sends the canned status-request frame
    device.write_all(&STATUS_REQUEST_FRAME).await.unwrap();

    let sink_probe = Arc::clone(&sink);
    wait_for(|| {
        let sink = Arc::clone(&sink_probe);
        async move { sink.count().await == 1 }
    })
    .await;

    let forwarded = sink.forwarded.lock().await;
    assert_eq!(forwarded[0].0, "127.0.0.1");
    assert_eq!(forwarded[0].1, MessageType::StatusRequest);
    assert!(forwarded[0].1.is_request());
    assert!(forwarded[0].2.is_empty());
    drop(forwarded);

    server.stop();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn rejected_device_is_closed_before_registration() {
    let sink = RecordingSink::new();
    let allowlist = MemoryAllowlist::with_addresses(["10.9.9.9"]).await;

    let server = Arc::new(
        GatewayServer::new(test_config())
            .allowlist(Arc::new(allowlist))
            .sink(Arc::clone(&sink) as Arc<dyn DataSink>),
    );
    let handle = start(Arc::clone(&server)).await;

    let mut device = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();

    // The socket is closed by the gateway: read sees EOF
    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(Duration::from_secs(2), device.read(&mut buf))
        .await
        .expect("gateway should close the socket");
    assert_eq!(read.unwrap(), 0);

    // No registration, no sink forward
    assert_eq!(server.registry().current_count().await, 0);
    assert_eq!(sink.count().await, 0);

    server.stop();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn checksum_failure_drops_frame_but_keeps_connection() {
    use tsc_gateway::protocol::{ChecksumOutcome, FnChecksum};

    let sink = RecordingSink::new();
    let allowlist = MemoryAllowlist::with_addresses(["127.0.0.1"]).await;

    let server = Arc::new(
        GatewayServer::new(test_config())
            .allowlist(Arc::new(allowlist))
            .sink(Arc::clone(&sink) as Arc<dyn DataSink>)
            .checksum(Arc::new(FnChecksum(|_: &[u8]| {
                ChecksumOutcome::Invalid("trailer mismatch".into())
            }))),
    );
    let handle = start(Arc::clone(&server)).await;

    let mut device = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();

    let registry = Arc::clone(server.registry());
    wait_for(|| {
        let registry = Arc::clone(&registry);
        async move { registry.is_active("127.0.0.1").await }
    })
    .await;

    device.write_all(&STATUS_REQUEST_FRAME).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The frame is dropped before the sink, the connection stays open
    assert_eq!(sink.count().await, 0);
    assert!(server.registry().is_active("127.0.0.1").await);

    server.stop();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn duplicate_address_replaces_existing_connection() {
    let allowlist = MemoryAllowlist::with_addresses(["127.0.0.1"]).await;
    let server = Arc::new(GatewayServer::new(test_config()).allowlist(Arc::new(allowlist)));
    let handle = start(Arc::clone(&server)).await;

    let addr = server.local_addr().unwrap();
    let mut first = TcpStream::connect(addr).await.unwrap();

    let registry = Arc::clone(server.registry());
    wait_for(|| {
        let registry = Arc::clone(&registry);
        async move { registry.is_active("127.0.0.1").await }
    })
    .await;

    let _second = TcpStream::connect(addr).await.unwrap();

    // The first socket is closed by the gateway; the id stays registered once
    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(Duration::from_secs(2), first.read(&mut buf))
        .await
        .expect("first connection should be closed");
    assert_eq!(read.unwrap(), 0);

    assert_eq!(server.registry().current_count().await, 1);
    assert!(server.registry().is_active("127.0.0.1").await);

    server.stop();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn idle_connection_is_swept() {
    let allowlist = MemoryAllowlist::with_addresses(["127.0.0.1"]).await;
    let config = GatewayConfig::with_addr("127.0.0.1:0".parse().unwrap())
        .poll_interval(Duration::from_secs(600))
        .idle_timeout(Duration::from_millis(100))
        .sweep_interval(Duration::from_millis(50));

    let server = Arc::new(GatewayServer::new(config).allowlist(Arc::new(allowlist)));
    let handle = start(Arc::clone(&server)).await;

    let _device = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();

    let registry = Arc::clone(server.registry());
    wait_for(|| {
        let registry = Arc::clone(&registry);
        async move { registry.current_count().await == 1 }
    })
    .await;

    // The device never sends anything; it gets evicted
    let registry = Arc::clone(server.registry());
    wait_for(|| {
        let registry = Arc::clone(&registry);
        async move { registry.current_count().await == 0 }
    })
    .await;

    server.stop();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn poller_delivers_status_requests() {
    let allowlist = MemoryAllowlist::with_addresses(["127.0.0.1"]).await;
    let config = GatewayConfig::with_addr("127.0.0.1:0".parse().unwrap())
        .poll_interval(Duration::from_millis(50))
        .sweep_interval(Duration::from_secs(600));

    let server = Arc::new(GatewayServer::new(config).allowlist(Arc::new(allowlist)));
    let handle = start(Arc::clone(&server)).await;

    let mut device = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();

    // The device should observe the canned status-request frame
    let mut buf = [0u8; 10];
    tokio::time::timeout(Duration::from_secs(2), device.read_exact(&mut buf))
        .await
        .expect("poll frame should arrive")
        .unwrap();
    assert_eq!(buf, STATUS_REQUEST_FRAME);

    server.stop();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn operational_api_reaches_connected_device() {
    let allowlist = MemoryAllowlist::with_addresses(["127.0.0.1"]).await;
    let server = Arc::new(GatewayServer::new(test_config()).allowlist(Arc::new(allowlist)));
    let handle = start(Arc::clone(&server)).await;

    let mut device = TcpStream::connect(server.local_addr().unwrap()).await.unwrap();

    let registry = Arc::clone(server.registry());
    wait_for(|| {
        let registry = Arc::clone(&registry);
        async move { registry.is_active("127.0.0.1").await }
    })
    .await;

    let service = server.service();
    assert!(service.is_client_active("127.0.0.1").await);
    assert_eq!(service.active_clients().await.len(), 1);

    let sent = service.broadcast_message(0x12).await.unwrap();
    assert_eq!(sent, 1);

    let mut buf = [0u8; 10];
    device.read_exact(&mut buf).await.unwrap();
    assert_eq!(buf, STATUS_REQUEST_FRAME);

    assert_eq!(service.last_transmitted_opcode("127.0.0.1").await, Some(0x12));

    let stats = service.connection_statistics().await;
    assert_eq!(stats.active_connections, 1);
    assert_eq!(stats.total_connections, 1);

    server.stop();
    handle.await.unwrap().unwrap();
}
