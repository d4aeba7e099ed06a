//! Gateway server listener
//!
//! Owns the accept loop: admission control on every incoming socket, registry
//! registration, and one read task per admitted device. The server moves
//! through `Stopped → Running → Stopping → Stopped`; the state is published
//! on a watch channel so the accept loop and every read task observe a stop
//! promptly.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::JoinSet;

use crate::admission::{AdmissionControl, AllowlistProvider, MemoryAllowlist};
use crate::dispatch::{Dispatcher, HandlerTable};
use crate::error::{GatewayError, Result};
use crate::protocol::checksum::{AcceptAllChecksum, SharedVerifier};
use crate::protocol::FrameValidator;
use crate::registry::ConnectionRegistry;
use crate::service::CommsService;
use crate::sink::{DataSink, NullSink};
use crate::transport::{MessageSender, StatusPoller, TransmissionLog};

use super::config::GatewayConfig;
use super::connection::run_reader;

/// Server lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Running,
    Stopping,
}

/// TCP gateway server
pub struct GatewayServer {
    config: GatewayConfig,
    registry: Arc<ConnectionRegistry>,
    sender: Arc<MessageSender>,
    service: Arc<CommsService>,
    admission: AdmissionControl,
    sink: Arc<dyn DataSink>,
    verifier: SharedVerifier,
    handlers: Arc<HandlerTable>,
    state_tx: watch::Sender<ServerState>,
    connection_semaphore: Option<Arc<Semaphore>>,
    listener: Mutex<Option<TcpListener>>,
    local_addr: std::sync::OnceLock<SocketAddr>,
    readers: Mutex<JoinSet<()>>,
}

impl GatewayServer {
    /// Create a server with the given configuration
    ///
    /// Collaborators default to open admission, a discarding sink and an
    /// accept-all checksum; use the builder methods to inject real ones.
    pub fn new(config: GatewayConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let sender = Arc::new(MessageSender::new(Arc::clone(&registry)));
        let service = Arc::new(CommsService::new(
            Arc::clone(&registry),
            Arc::clone(&sender),
            Arc::new(TransmissionLog::new()),
        ));

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let (state_tx, _) = watch::channel(ServerState::Stopped);

        Self {
            config,
            registry,
            sender,
            service,
            admission: AdmissionControl::new(Arc::new(MemoryAllowlist::new())),
            sink: Arc::new(NullSink),
            verifier: Arc::new(AcceptAllChecksum),
            handlers: Arc::new(HandlerTable::with_defaults()),
            state_tx,
            connection_semaphore,
            listener: Mutex::new(None),
            local_addr: std::sync::OnceLock::new(),
            readers: Mutex::new(JoinSet::new()),
        }
    }

    /// Use the given allow-list provider for admission control
    pub fn allowlist(mut self, provider: Arc<dyn AllowlistProvider>) -> Self {
        self.admission = AdmissionControl::new(provider);
        self
    }

    /// Forward classified payloads to the given sink
    pub fn sink(mut self, sink: Arc<dyn DataSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Verify frame checksums with the given verifier
    pub fn checksum(mut self, verifier: SharedVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Handler table for inbound message routing
    pub fn handlers(&self) -> &Arc<HandlerTable> {
        &self.handlers
    }

    /// Connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Outbound send path
    pub fn sender(&self) -> &Arc<MessageSender> {
        &self.sender
    }

    /// Operational API facade
    pub fn service(&self) -> &Arc<CommsService> {
        &self.service
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServerState {
        *self.state_tx.borrow()
    }

    /// Address the server is bound to, once bound
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Bind the listen socket without starting the accept loop
    ///
    /// Useful for binding to port 0 and reading the assigned port before
    /// `run` is called. `run`/`run_until` bind implicitly if this was not.
    pub async fn bind(&self) -> Result<SocketAddr> {
        let mut listener = self.listener.lock().await;
        if let Some(ref bound) = *listener {
            return Ok(bound.local_addr()?);
        }

        let bound = TcpListener::bind(self.config.bind_addr).await?;
        let addr = bound.local_addr()?;
        let _ = self.local_addr.set(addr);
        *listener = Some(bound);
        Ok(addr)
    }

    /// Request a running server to stop
    pub fn stop(&self) {
        if *self.state_tx.borrow() == ServerState::Running {
            let _ = self.state_tx.send(ServerState::Stopping);
        }
    }

    /// Run the server until the process ends or `stop` is called
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Run the server with graceful shutdown
    ///
    /// Stops accepting, signals every read task, closes all live connections
    /// and drains in-flight work for up to the configured grace period.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        if self.state() != ServerState::Stopped {
            return Err(GatewayError::ServerState("server is already running"));
        }

        let addr = self.bind().await?;
        let listener = self
            .listener
            .lock()
            .await
            .take()
            .ok_or(GatewayError::ServerState("listen socket already consumed"))?;

        let validator = Arc::new(FrameValidator::new(Arc::clone(&self.verifier)));
        let dispatcher = Arc::new(Dispatcher::new(
            validator,
            Arc::clone(&self.sink),
            Arc::clone(&self.handlers),
            self.config.dispatch_workers,
            self.config.dispatch_queue_depth,
        ));

        let sweeper = self
            .registry
            .spawn_sweep_task(self.config.sweep_interval, self.config.idle_timeout);
        let poller = StatusPoller::spawn(
            Arc::clone(&self.registry),
            Arc::clone(&self.sender),
            self.config.poll_interval,
        );

        let _ = self.state_tx.send(ServerState::Running);
        tracing::info!(addr = %addr, "TCP server listening");

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener, &dispatcher) => result,
        };

        let _ = self.state_tx.send(ServerState::Stopping);
        tracing::info!("TCP server stopping");

        poller.abort();
        sweeper.abort();
        self.registry.close_all().await;
        self.drain_readers().await;

        let _ = self.state_tx.send(ServerState::Stopped);
        tracing::info!("TCP server stopped");

        result
    }

    async fn accept_loop(&self, listener: &TcpListener, dispatcher: &Arc<Dispatcher>) -> Result<()> {
        let mut state_rx = self.state_tx.subscribe();

        loop {
            tokio::select! {
                changed = state_rx.changed() => {
                    if changed.is_err() || *state_rx.borrow() != ServerState::Running {
                        return Ok(());
                    }
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((socket, peer_addr)) => {
                            self.handle_connection(socket, peer_addr, dispatcher).await;
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
            }
        }
    }

    async fn handle_connection(
        &self,
        socket: TcpStream,
        peer_addr: SocketAddr,
        dispatcher: &Arc<Dispatcher>,
    ) {
        // Limit check first; dropping the socket closes it
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let client_id = peer_addr.ip().to_string();

        // Admission check happens before any registry interaction; a
        // rejected socket is dropped (closed) right here.
        if !self.admission.is_admitted(&client_id).await {
            tracing::warn!(ip = %client_id, "Connection attempt from non-whitelisted IP");
            return;
        }
        self.admission.mark_seen(&client_id).await;

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::warn!(error = %e, "Failed to configure socket");
            }
        }

        let (read_half, write_half) = socket.into_split();

        // A prior connection under the same address is closed and replaced
        let connection = match self
            .registry
            .add(&client_id, peer_addr, Box::new(write_half))
            .await
        {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!(ip = %client_id, error = %e, "Failed to register connection");
                return;
            }
        };

        tracing::info!(client = %client_id, peer = %peer_addr, "Client connection accepted");

        let registry = Arc::clone(&self.registry);
        let dispatcher = Arc::clone(dispatcher);
        let read_buffer_size = self.config.read_buffer_size;
        let idle_timeout = self.config.idle_timeout;
        let state_rx = self.state_tx.subscribe();

        self.readers.lock().await.spawn(async move {
            let _permit = permit;
            run_reader(
                connection,
                read_half,
                registry,
                dispatcher,
                read_buffer_size,
                idle_timeout,
                state_rx,
            )
            .await;
        });
    }

    /// Wait for read tasks to finish, bounded by the shutdown grace period
    async fn drain_readers(&self) {
        let mut readers = self.readers.lock().await;
        let deadline = tokio::time::Instant::now() + self.config.shutdown_grace;

        while let Ok(Some(_)) = tokio::time::timeout_at(deadline, readers.join_next()).await {}

        if !readers.is_empty() {
            tracing::warn!(
                remaining = readers.len(),
                "Read tasks did not finish within grace period, aborting"
            );
            readers.abort_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_state_is_stopped() {
        let server = GatewayServer::new(GatewayConfig::with_addr("127.0.0.1:0".parse().unwrap()));
        assert_eq!(server.state(), ServerState::Stopped);
        assert!(server.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_bind_assigns_port() {
        let server = GatewayServer::new(GatewayConfig::with_addr("127.0.0.1:0".parse().unwrap()));
        let addr = server.bind().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.local_addr(), Some(addr));
    }

    #[tokio::test]
    async fn test_stop_terminates_run() {
        let server = Arc::new(GatewayServer::new(GatewayConfig::with_addr(
            "127.0.0.1:0".parse().unwrap(),
        )));
        server.bind().await.unwrap();

        let runner = Arc::clone(&server);
        let handle = tokio::spawn(async move { runner.run().await });

        // Wait until the accept loop is up, then request a stop
        while server.state() != ServerState::Running {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        server.stop();

        tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .expect("server should stop")
            .unwrap()
            .unwrap();
        assert_eq!(server.state(), ServerState::Stopped);
    }
}
