//! Frame construction and parsing
//!
//! Pure functions over raw byte sequences. Building a request frame either
//! returns one of the canned encodings (checksums are precomputed per device
//! CRC) or the short `[lenHi, lenLo, opcode, payload...]` command form the
//! backend uses for payload-carrying requests.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{GatewayError, Result};
use crate::protocol::constants::*;

/// Structural fields extracted from a raw frame
#[derive(Debug, Clone)]
pub struct ParsedFrame {
    /// Declared length from the header (excludes the checksum trailer)
    pub declared_length: usize,
    /// Opcode byte
    pub opcode: u8,
    /// Payload bytes (empty when the frame carries none)
    pub payload: Bytes,
}

/// Build a canned request frame for the given opcode
///
/// Only opcodes with a precomputed encoding can be built this way; the
/// checksum trailer is part of the canned bytes.
pub fn build_frame(opcode: u8) -> Result<Bytes> {
    let frame: &'static [u8] = match opcode {
        OP_STATUS_REQUEST => &STATUS_REQUEST_FRAME,
        OP_STARTUP_CODE => &STARTUP_CODE_FRAME,
        _ => return Err(GatewayError::UnsupportedOpcode(opcode)),
    };

    tracing::debug!(
        opcode = %super::format_opcode(opcode),
        bytes = %super::bytes_to_hex(frame),
        "Built canned frame"
    );

    Ok(Bytes::from_static(frame))
}

/// Build a payload-carrying command frame
///
/// Emits `[lengthHi, lengthLo, opcode, payload...]` where the length field is
/// exactly `payload.len() + 1`. An empty payload degrades to [`build_frame`].
pub fn build_frame_with_payload(opcode: u8, payload: &[u8]) -> Result<Bytes> {
    if !is_opcode_supported(opcode) {
        return Err(GatewayError::UnsupportedOpcode(opcode));
    }

    if payload.is_empty() {
        return build_frame(opcode);
    }

    let total_length = 1 + payload.len(); // opcode + payload
    let mut buf = BytesMut::with_capacity(2 + total_length);
    buf.put_u16(total_length as u16);
    buf.put_u8(opcode);
    buf.put_slice(payload);

    tracing::debug!(
        opcode = %super::format_opcode(opcode),
        payload_len = payload.len(),
        "Built command frame"
    );

    Ok(buf.freeze())
}

/// Parse the structural fields of a raw frame
///
/// Fails when the frame is shorter than the minimum header; does not verify
/// the checksum or the declared length (see [`validate_structure`]).
pub fn parse(raw: &[u8]) -> Result<ParsedFrame> {
    if raw.len() < MIN_HEADER_LEN {
        return Err(GatewayError::FrameTooShort {
            actual: raw.len(),
            needed: MIN_HEADER_LEN,
        });
    }

    let declared_length =
        ((raw[LENGTH_OFFSET] as usize) << 8) | raw[LENGTH_OFFSET + 1] as usize;
    let opcode = raw[OPCODE_OFFSET];

    let payload = if raw.len() > PAYLOAD_OFFSET + CHECKSUM_LEN {
        Bytes::copy_from_slice(&raw[PAYLOAD_OFFSET..raw.len() - CHECKSUM_LEN])
    } else {
        Bytes::new()
    };

    Ok(ParsedFrame {
        declared_length,
        opcode,
        payload,
    })
}

/// Check the structural invariants of a raw frame
///
/// The frame must be long enough to contain the opcode and checksum trailer,
/// and the declared length plus the trailer must equal the actual length.
pub fn validate_structure(raw: &[u8]) -> bool {
    if raw.len() < MIN_FRAME_LEN {
        return false;
    }

    let declared_length =
        ((raw[LENGTH_OFFSET] as usize) << 8) | raw[LENGTH_OFFSET + 1] as usize;
    declared_length + CHECKSUM_LEN == raw.len()
}
