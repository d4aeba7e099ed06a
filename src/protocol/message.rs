//! Message classification and the inbound message record

use std::time::SystemTime;

use bytes::Bytes;

use crate::protocol::constants::*;

/// Direction category of a message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageCategory {
    Request,
    Response,
    Unknown,
}

/// Classified message type
///
/// Classification is total: opcodes outside the known table map to
/// [`MessageType::UserRequest`] so no frame is ever dropped solely for
/// carrying an unrecognized opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Intersection status data (0x13)
    IntersectionStatus,
    /// Detector info data (0x23)
    DetectorInfo,
    /// Phase info data (0x33)
    PhaseInfo,
    /// Status request (0x12)
    StatusRequest,
    /// Network test (0xDA)
    NetworkTest,
    /// Startup code (0xA2)
    StartupCode,
    /// Fallback for unrecognized opcodes
    UserRequest,
    /// Placeholder used before classification
    Unknown,
}

impl MessageType {
    /// Classify an opcode byte
    pub fn from_opcode(opcode: u8) -> Self {
        match opcode {
            OP_INTERSECTION_STATUS => MessageType::IntersectionStatus,
            OP_DETECTOR_INFO => MessageType::DetectorInfo,
            OP_PHASE_INFO => MessageType::PhaseInfo,
            OP_STATUS_REQUEST => MessageType::StatusRequest,
            OP_NETWORK_TEST => MessageType::NetworkTest,
            OP_STARTUP_CODE => MessageType::StartupCode,
            _ => MessageType::UserRequest,
        }
    }

    pub fn category(&self) -> MessageCategory {
        match self {
            MessageType::IntersectionStatus
            | MessageType::DetectorInfo
            | MessageType::PhaseInfo
            | MessageType::UserRequest => MessageCategory::Response,
            MessageType::StatusRequest | MessageType::NetworkTest | MessageType::StartupCode => {
                MessageCategory::Request
            }
            MessageType::Unknown => MessageCategory::Unknown,
        }
    }

    pub fn is_response(&self) -> bool {
        self.category() == MessageCategory::Response
    }

    pub fn is_request(&self) -> bool {
        self.category() == MessageCategory::Request
    }

    /// Wire name used in sink payloads and logs
    pub fn name(&self) -> &'static str {
        match self {
            MessageType::IntersectionStatus => "INTERSECTION_STATUS",
            MessageType::DetectorInfo => "DETECTOR_INFO",
            MessageType::PhaseInfo => "PHASE_INFO",
            MessageType::StatusRequest => "STATUS_REQUEST",
            MessageType::NetworkTest => "NETWORK_TEST",
            MessageType::StartupCode => "STARTUP_CODE",
            MessageType::UserRequest => "USER_REQUEST",
            MessageType::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated, classified inbound message
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Client the frame arrived from
    pub client_id: String,
    /// Opcode byte
    pub opcode: u8,
    /// Payload bytes (reference-counted)
    pub payload: Bytes,
    /// Classified type
    pub msg_type: MessageType,
    /// Arrival time
    pub received_at: SystemTime,
}

impl InboundMessage {
    pub fn new(client_id: impl Into<String>, opcode: u8, payload: Bytes) -> Self {
        Self {
            client_id: client_id.into(),
            opcode,
            payload,
            msg_type: MessageType::from_opcode(opcode),
            received_at: SystemTime::now(),
        }
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Opcode formatted for logs
    pub fn opcode_hex(&self) -> String {
        super::format_opcode(self.opcode)
    }
}

impl std::fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Message{{client='{}', type={}, opcode={}, size={}}}",
            self.client_id,
            self.msg_type,
            self.opcode_hex(),
            self.size()
        )
    }
}
