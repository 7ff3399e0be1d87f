//! High-level command encoding
//!
//! Maps the operations offered by the control surface (ping, refresh, raw
//! pass-through, segment update) onto terminated frames. Image updates are
//! multi-frame and live in `lumitag-core`'s pipeline instead.

use crate::crc::crc16;
use crate::frame::{Frame, FrameError, MCU_CMD_REFRESH, PROTOCOL_SEGMENT};
use crate::plid::DeviceId;

/// Segment label bitmap size in bytes
pub const SEGMENT_BITMAP_SIZE: usize = 23;

/// Repeat count for segment update frames
pub const SEGMENT_REPEATS: u16 = 100;

const REFRESH_PAYLOAD: [u8; 22] = [0; 22];
const SEGMENT_CMD: u8 = 0xBA;
// Page, duration and mode literals observed on the wire
const SEGMENT_TAIL: [u8; 7] = [0x00, 0x00, 0x09, 0x00, 0x10, 0x00, 0x31];

/// A single-frame operation addressed to one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EslCommand<'a> {
    /// Wake/presence ping; the control surface defaults to 400 repeats
    Ping { repeats: u16 },
    /// Refresh the display from its page memory
    Refresh,
    /// Pass-through frame: `data[0]` is the command byte, the rest payload
    Raw {
        protocol: u8,
        data: &'a [u8],
        repeats: u16,
    },
    /// Segment label bitmap update
    Segments {
        bitmap: &'a [u8; SEGMENT_BITMAP_SIZE],
    },
}

impl EslCommand<'_> {
    /// Encode this command into a terminated frame.
    ///
    /// `wide` selects the PP16 physical layer for ping and refresh; raw
    /// and segment frames always use the narrow layer, matching the label
    /// firmware's pass-through path.
    pub fn to_frame(&self, plid: &DeviceId, wide: bool) -> Result<Frame, FrameError> {
        match self {
            EslCommand::Ping { repeats } => Ok(Frame::ping(plid, wide, *repeats)),
            EslCommand::Refresh => Frame::mcu(plid, MCU_CMD_REFRESH, &REFRESH_PAYLOAD, wide, 1),
            EslCommand::Raw {
                protocol,
                data,
                repeats,
            } => {
                let (&command, payload) = data.split_first().ok_or(FrameError::MissingCommand)?;
                Frame::raw(*protocol, plid, command, payload, *repeats)
            }
            EslCommand::Segments { bitmap } => {
                let mut payload = [0u8; 3 + SEGMENT_BITMAP_SIZE + 2 + SEGMENT_TAIL.len()];
                payload[3..26].copy_from_slice(*bitmap);
                // The bitmap carries its own inner checksum
                let segcrc = crc16(*bitmap);
                payload[26] = segcrc as u8;
                payload[27] = (segcrc >> 8) as u8;
                payload[28..].copy_from_slice(&SEGMENT_TAIL);
                Frame::raw(PROTOCOL_SEGMENT, plid, SEGMENT_CMD, &payload, SEGMENT_REPEATS)
            }
        }
    }
}

/// Errors from hex text parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HexError {
    /// Odd number of hex digits
    OddDigitCount,
    /// A character was neither a hex digit nor ignorable separator
    InvalidDigit,
    /// Decoded bytes exceed the destination buffer
    TooLong,
}

/// Parse hex text from the command surface into `out`, returning the byte
/// count. Whitespace and commas between digits are ignored.
pub fn parse_hex(text: &str, out: &mut [u8]) -> Result<usize, HexError> {
    let mut len = 0usize;
    let mut pending: Option<u8> = None;

    for ch in text.chars() {
        if ch.is_ascii_whitespace() || ch == ',' {
            continue;
        }
        let nibble = ch.to_digit(16).ok_or(HexError::InvalidDigit)? as u8;
        match pending.take() {
            None => pending = Some(nibble),
            Some(high) => {
                if len >= out.len() {
                    return Err(HexError::TooLong);
                }
                out[len] = (high << 4) | nibble;
                len += 1;
            }
        }
    }

    if pending.is_some() {
        return Err(HexError::OddDigitCount);
    }
    Ok(len)
}
