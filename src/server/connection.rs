//! Per-connection read task
//!
//! One task per admitted device, woken by the runtime when the socket is
//! readable. Each successful read is published to the dispatcher; EOF, read
//! errors and idle timeouts tear the connection down. The task also exits
//! when its connection is closed (replaced or removed) or the server stops.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::watch;

use crate::dispatch::{Dispatcher, RawEvent};
use crate::registry::{ClientConnection, ConnectionRegistry};

use super::listener::ServerState;

pub(crate) async fn run_reader(
    connection: Arc<ClientConnection>,
    mut read_half: OwnedReadHalf,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<Dispatcher>,
    read_buffer_size: usize,
    idle_timeout: Duration,
    mut state_rx: watch::Receiver<ServerState>,
) {
    let client_id = connection.client_id().to_string();
    let mut buf = vec![0u8; read_buffer_size];

    loop {
        if *state_rx.borrow() != ServerState::Running {
            break;
        }

        tokio::select! {
            _ = connection.closed() => {
                tracing::debug!(client = %client_id, "Connection closed, reader exiting");
                break;
            }
            changed = state_rx.changed() => {
                if changed.is_err() || *state_rx.borrow() != ServerState::Running {
                    break;
                }
            }
            result = tokio::time::timeout(idle_timeout, read_half.read(&mut buf)) => {
                match result {
                    Err(_) => {
                        // The read clock expired; sends also count as activity,
                        // so only evict if the connection is genuinely idle.
                        if connection.idle_duration() >= idle_timeout {
                            tracing::info!(client = %client_id, "Connection idle timeout");
                            break;
                        }
                    }
                    Ok(Ok(0)) => {
                        tracing::info!(client = %client_id, "Connection closed by peer");
                        break;
                    }
                    Ok(Ok(n)) => {
                        connection.add_bytes_received(n as u64);
                        connection.increment_message_count();

                        tracing::debug!(client = %client_id, bytes = n, "Data received");

                        dispatcher.submit(RawEvent {
                            client_id: client_id.clone(),
                            data: Bytes::copy_from_slice(&buf[..n]),
                        });
                    }
                    Ok(Err(e)) => {
                        tracing::error!(client = %client_id, error = %e, "Data read error");
                        break;
                    }
                }
            }
        }
    }

    registry.remove_if_current(&connection).await;
    tracing::info!(client = %client_id, "Client connection terminated");
}
