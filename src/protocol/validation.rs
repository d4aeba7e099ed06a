//! Frame validation pipeline
//!
//! Combines the structural checks with the injected checksum verifier and
//! reports a discriminated outcome. Validation never panics; invalid frames
//! are dropped by the dispatcher after logging, the connection stays open.

use crate::protocol::checksum::SharedVerifier;
use crate::protocol::constants::{CHECKSUM_LEN, LENGTH_OFFSET, MIN_FRAME_LEN};

/// Outcome of validating a raw frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(String),
}

impl ValidationOutcome {
    pub fn invalid(reason: impl Into<String>) -> Self {
        ValidationOutcome::Invalid(reason.into())
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Valid => None,
            ValidationOutcome::Invalid(reason) => Some(reason),
        }
    }
}

impl std::fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationOutcome::Valid => write!(f, "Valid"),
            ValidationOutcome::Invalid(reason) => write!(f, "Invalid: {}", reason),
        }
    }
}

/// Validates inbound frames before classification
pub struct FrameValidator {
    verifier: SharedVerifier,
}

impl FrameValidator {
    pub fn new(verifier: SharedVerifier) -> Self {
        Self { verifier }
    }

    /// Validate a raw frame from the given client
    pub fn validate(&self, client_id: &str, raw: &[u8]) -> ValidationOutcome {
        if client_id.trim().is_empty() {
            return ValidationOutcome::invalid("Invalid client ID");
        }

        if raw.is_empty() {
            return ValidationOutcome::invalid("Empty message data");
        }

        if let Some(reason) = self.check_structure(raw) {
            return ValidationOutcome::Invalid(reason);
        }

        let crc = self.verifier.verify(raw);
        if !crc.is_valid() {
            return ValidationOutcome::invalid(format!(
                "CRC validation failed: {}",
                crc.reason().unwrap_or("unknown")
            ));
        }

        tracing::trace!(client = %client_id, "Frame validation passed");
        ValidationOutcome::Valid
    }

    fn check_structure(&self, raw: &[u8]) -> Option<String> {
        if raw.len() < MIN_FRAME_LEN {
            return Some(format!(
                "Message too short: {} bytes, need {}",
                raw.len(),
                MIN_FRAME_LEN
            ));
        }

        let declared =
            ((raw[LENGTH_OFFSET] as usize) << 8) | raw[LENGTH_OFFSET + 1] as usize;
        if declared + CHECKSUM_LEN != raw.len() {
            return Some(format!(
                "Length mismatch: declared={}, actual={}",
                declared + CHECKSUM_LEN,
                raw.len()
            ));
        }

        None
    }
}
