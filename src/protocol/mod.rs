//! Binary protocol codec for the controller wire format
//!
//! Pure functions and types: frame build/parse, structural and checksum
//! validation, and opcode classification. No I/O, no shared state.
//!
//! ```text
//! offset 0-1: sync marker 0x7F 0x7F
//! offset 2-3: length field (big-endian, excludes the checksum trailer)
//! offset 4-6: header bytes
//! offset 7:   opcode
//! offset 8..: payload
//! last 2:     checksum trailer
//! ```

pub mod checksum;
pub mod constants;
pub mod frame;
pub mod message;
pub mod validation;

pub use checksum::{AcceptAllChecksum, ChecksumOutcome, ChecksumVerifier, FnChecksum, SharedVerifier};
pub use frame::{build_frame, build_frame_with_payload, parse, validate_structure, ParsedFrame};
pub use message::{InboundMessage, MessageCategory, MessageType};
pub use validation::{FrameValidator, ValidationOutcome};

/// Format an opcode byte for logs (`0x12`)
pub fn format_opcode(opcode: u8) -> String {
    format!("0x{:02X}", opcode)
}

/// Format a byte slice as space-separated hex (`7F 7F 00`)
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
