//! Pluggable checksum verification
//!
//! The device CRC is proprietary and configured per deployment, so the codec
//! treats it as an injected capability. The default verifier accepts every
//! frame; embedders with the device algorithm supply their own implementation.

use std::sync::Arc;

/// Outcome of a checksum verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumOutcome {
    Valid,
    Invalid(String),
}

impl ChecksumOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChecksumOutcome::Valid)
    }

    /// Failure reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            ChecksumOutcome::Valid => None,
            ChecksumOutcome::Invalid(reason) => Some(reason),
        }
    }
}

impl std::fmt::Display for ChecksumOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChecksumOutcome::Valid => write!(f, "CRC valid"),
            ChecksumOutcome::Invalid(reason) => write!(f, "CRC invalid: {}", reason),
        }
    }
}

/// Verifies the trailing checksum of a complete raw frame
pub trait ChecksumVerifier: Send + Sync {
    fn verify(&self, raw: &[u8]) -> ChecksumOutcome;
}

/// Verifier that accepts every frame
///
/// Used when no device CRC implementation has been injected.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllChecksum;

impl ChecksumVerifier for AcceptAllChecksum {
    fn verify(&self, _raw: &[u8]) -> ChecksumOutcome {
        ChecksumOutcome::Valid
    }
}

/// Adapter turning a plain function into a verifier
pub struct FnChecksum<F>(pub F);

impl<F> ChecksumVerifier for FnChecksum<F>
where
    F: Fn(&[u8]) -> ChecksumOutcome + Send + Sync,
{
    fn verify(&self, raw: &[u8]) -> ChecksumOutcome {
        (self.0)(raw)
    }
}

/// Shared handle to a verifier
pub type SharedVerifier = Arc<dyn ChecksumVerifier>;
