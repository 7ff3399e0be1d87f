//! Command frame construction
//!
//! Three frame kinds share one termination rule: the CRC is computed over
//! the body exactly as built, then (for wide-protocol frames) the fixed
//! header `00 00 00 40` is prepended, and only then are the two CRC bytes
//! appended little-endian. The header is therefore never covered by the
//! checksum, and the order of those steps must not change.

use heapless::Vec;

use crate::crc::crc16;
use crate::plid::DeviceId;

/// Protocol byte for dot-matrix (MCU-driven) labels
pub const PROTOCOL_DM: u8 = 0x85;

/// Protocol byte for segment labels
pub const PROTOCOL_SEGMENT: u8 = 0x84;

/// Wide-protocol (PP16) header, prepended after CRC computation
pub const WIDE_HEADER: [u8; 4] = [0x00, 0x00, 0x00, 0x40];

/// MCU sub-command: refresh the display from page memory
pub const MCU_CMD_REFRESH: u8 = 0x01;

/// MCU sub-command: image update parameters
pub const MCU_CMD_PARAMS: u8 = 0x05;

/// MCU sub-command: image data chunk
pub const MCU_CMD_DATA: u8 = 0x20;

/// Maximum frame body size before termination
pub const MAX_BODY_SIZE: usize = 48;

/// Maximum complete frame size (body + wide header + CRC)
pub const MAX_FRAME_SIZE: usize = MAX_BODY_SIZE + WIDE_HEADER.len() + 2;

const PING_BODY_SIZE: usize = 32;
const MCU_HEADER_SIZE: usize = 10;
const RAW_HEADER_SIZE: usize = 6;

/// Errors from frame construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds the designed frame body maximum
    PayloadTooLarge,
    /// Raw command data carried no command byte
    MissingCommand,
}

/// A complete, terminated frame ready for transmission.
///
/// Frames are constructed, transmitted, and discarded; they are never
/// persisted or mutated after termination.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    bytes: Vec<u8, MAX_FRAME_SIZE>,
    repeats: u16,
    wide: bool,
}

impl Frame {
    /// Build a ping/wake frame: fixed 32-byte body of protocol byte,
    /// identifier, command `0x17 0x01 0x00 0x00 0x00`, then 22 fill bytes
    /// of `0x01`.
    pub fn ping(plid: &DeviceId, wide: bool, repeats: u16) -> Self {
        let mut body: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
        // Body is far below MAX_BODY_SIZE; pushes cannot fail
        let _ = body.push(PROTOCOL_DM);
        let _ = body.extend_from_slice(&plid.wire_bytes());
        let _ = body.extend_from_slice(&[0x17, 0x01, 0x00, 0x00, 0x00]);
        while body.len() < PING_BODY_SIZE {
            let _ = body.push(0x01);
        }
        Self {
            bytes: terminate(body, wide),
            repeats,
            wide,
        }
    }

    /// Build an MCU frame: protocol byte, identifier, `0x34 0x00 0x00 0x00`,
    /// the sub-command byte, then the payload.
    pub fn mcu(
        plid: &DeviceId,
        command: u8,
        payload: &[u8],
        wide: bool,
        repeats: u16,
    ) -> Result<Self, FrameError> {
        if payload.len() > MAX_BODY_SIZE - MCU_HEADER_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        let mut body: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
        let _ = body.push(PROTOCOL_DM);
        let _ = body.extend_from_slice(&plid.wire_bytes());
        let _ = body.extend_from_slice(&[0x34, 0x00, 0x00, 0x00, command]);
        body.extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            bytes: terminate(body, wide),
            repeats,
            wide,
        })
    }

    /// Build a raw pass-through frame with a caller-supplied protocol byte.
    ///
    /// Raw frames always use the narrow (PP4) physical layer.
    pub fn raw(
        protocol: u8,
        plid: &DeviceId,
        command: u8,
        payload: &[u8],
        repeats: u16,
    ) -> Result<Self, FrameError> {
        if payload.len() > MAX_BODY_SIZE - RAW_HEADER_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        let mut body: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
        let _ = body.push(protocol);
        let _ = body.extend_from_slice(&plid.wire_bytes());
        let _ = body.push(command);
        body.extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            bytes: terminate(body, false),
            repeats,
            wide: false,
        })
    }

    /// Complete frame bytes, including header (if wide) and CRC.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total frame length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the frame carries no bytes (never true once built).
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// How many times the signal engine should repeat this frame.
    pub fn repeats(&self) -> u16 {
        self.repeats
    }

    /// Whether this is a wide-protocol (PP16) frame.
    pub fn is_wide(&self) -> bool {
        self.wide
    }
}

/// Apply the shared termination rule to a built body.
fn terminate(body: Vec<u8, MAX_FRAME_SIZE>, wide: bool) -> Vec<u8, MAX_FRAME_SIZE> {
    // CRC covers the body only, never the wide header
    let crc = crc16(&body);

    let mut framed: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
    if wide {
        let _ = framed.extend_from_slice(&WIDE_HEADER);
    }
    // Body length is bounded by the builders; capacity always suffices
    let _ = framed.extend_from_slice(&body);
    let _ = framed.push(crc as u8);
    let _ = framed.push((crc >> 8) as u8);
    framed
}
