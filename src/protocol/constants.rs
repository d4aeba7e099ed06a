//! Wire protocol constants
//!
//! Frame layout (all integers big-endian):
//!
//! ```text
//! offset 0-1: sync marker 0x7F 0x7F
//! offset 2-3: length field (frame length excluding the checksum trailer)
//! offset 4-6: header bytes
//! offset 7:   opcode
//! offset 8..: payload (0+ bytes)
//! last 2:     checksum trailer
//! ```

/// Frame synchronization marker
pub const SYNC_MARKER: [u8; 2] = [0x7F, 0x7F];

/// Offset of the big-endian length field
pub const LENGTH_OFFSET: usize = 2;

/// Offset of the opcode byte
pub const OPCODE_OFFSET: usize = 7;

/// Offset of the first payload byte
pub const PAYLOAD_OFFSET: usize = 8;

/// Size of the trailing checksum
pub const CHECKSUM_LEN: usize = 2;

/// Minimum bytes needed to reach the opcode
pub const MIN_HEADER_LEN: usize = OPCODE_OFFSET + 1;

/// Minimum length of a complete frame (header through checksum, empty payload)
pub const MIN_FRAME_LEN: usize = MIN_HEADER_LEN + CHECKSUM_LEN;

/// Status request opcode
pub const OP_STATUS_REQUEST: u8 = 0x12;

/// Startup code opcode
pub const OP_STARTUP_CODE: u8 = 0xA2;

/// Intersection status response opcode
pub const OP_INTERSECTION_STATUS: u8 = 0x13;

/// Detector info response opcode
pub const OP_DETECTOR_INFO: u8 = 0x23;

/// Phase info response opcode
pub const OP_PHASE_INFO: u8 = 0x33;

/// Network test opcode
pub const OP_NETWORK_TEST: u8 = 0xDA;

/// Canned status-request frame, checksum precomputed for the device CRC
pub const STATUS_REQUEST_FRAME: [u8; 10] =
    [0x7F, 0x7F, 0x00, 0x08, 0x00, 0x01, 0x00, 0x12, 0x3B, 0x1F];

/// Canned startup-code frame, checksum precomputed for the device CRC
pub const STARTUP_CODE_FRAME: [u8; 10] =
    [0x7F, 0x7F, 0x00, 0x08, 0x00, 0x01, 0x00, 0xA2, 0x8E, 0x94];

/// Opcodes the frame builder accepts
///
/// Union of the payload-capable command set and the canned request frames.
pub const SUPPORTED_OPCODES: [u8; 8] = [0x11, 0x12, 0x13, 0x21, 0x22, 0x23, 0x24, 0xA2];

/// Whether the builder accepts the given opcode
pub fn is_opcode_supported(opcode: u8) -> bool {
    SUPPORTED_OPCODES.contains(&opcode)
}
