//! Crate-level error types
//!
//! Protocol and connectivity failures are handled close to where they occur
//! (logged, connection-scoped cleanup); only admission and argument errors
//! surface to callers. Nothing here is fatal to the process.

use std::io;

use crate::protocol::format_opcode;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Top-level error type for gateway operations
#[derive(Debug)]
pub enum GatewayError {
    /// Frame could not be built: the opcode has no known encoding
    UnsupportedOpcode(u8),
    /// Frame too short to contain the required header fields
    FrameTooShort { actual: usize, needed: usize },
    /// Missing or empty client id / message data on an API call
    InvalidArgument(String),
    /// Target client exists but is not active
    ClientNotActive(String),
    /// Write to a client socket failed; the connection has been torn down
    SendFailed { client_id: String, source: io::Error },
    /// Backend sink rejected or failed to receive a forwarded payload
    Sink(String),
    /// Underlying socket / listener I/O error
    Io(io::Error),
    /// Server is not in a state that allows the requested operation
    ServerState(&'static str),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::UnsupportedOpcode(opcode) => {
                write!(f, "Unsupported opcode: {}", format_opcode(*opcode))
            }
            GatewayError::FrameTooShort { actual, needed } => {
                write!(f, "Frame too short: {} bytes, need {}", actual, needed)
            }
            GatewayError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            GatewayError::ClientNotActive(id) => write!(f, "Client is not active: {}", id),
            GatewayError::SendFailed { client_id, source } => {
                write!(f, "Send failed for client {}: {}", client_id, source)
            }
            GatewayError::Sink(msg) => write!(f, "Sink error: {}", msg),
            GatewayError::Io(e) => write!(f, "I/O error: {}", e),
            GatewayError::ServerState(msg) => write!(f, "Server state error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::SendFailed { source, .. } => Some(source),
            GatewayError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for GatewayError {
    fn from(e: io::Error) -> Self {
        GatewayError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_unsupported_opcode() {
        let err = GatewayError::UnsupportedOpcode(0x7B);
        assert_eq!(err.to_string(), "Unsupported opcode: 0x7B");
    }

    #[test]
    fn test_io_error_source() {
        let err = GatewayError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
