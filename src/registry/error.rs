//! Registry error types

/// Error type for registry operations
#[derive(Debug, Clone)]
pub enum RegistryError {
    /// Missing or empty client id on an API call
    InvalidArgument(String),
    /// No connection registered under the given id
    NotFound(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            RegistryError::NotFound(id) => write!(f, "Connection not found: {}", id),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<RegistryError> for crate::error::GatewayError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::InvalidArgument(msg) => crate::error::GatewayError::InvalidArgument(msg),
            RegistryError::NotFound(id) => crate::error::GatewayError::ClientNotActive(id),
        }
    }
}
