//! Wire format for the Lumitag infrared ESL protocol
//!
//! Shelf labels are addressed over a one-way infrared link. Every command
//! travels in a CRC-checked binary frame:
//!
//! ```text
//! ┌──────────┬────────────┬─────────┬─────────────┬──────────┐
//! │ PROTOCOL │ IDENTIFIER │ COMMAND │ PAYLOAD     │ CRC      │
//! │ 1B       │ 4B         │ 1B+     │ variable    │ 2B (LE)  │
//! └──────────┴────────────┴─────────┴─────────────┴──────────┘
//! ```
//!
//! Wide-protocol (PP16) frames additionally carry the fixed header
//! `00 00 00 40` in front of the protocol byte; the CRC still covers only
//! the original body.
//!
//! This crate is pure data plumbing: identifier derivation, the run-length
//! image compressor, frame construction, and the high-level command
//! surface. Physical transmission lives in `lumitag-drivers`.

#![no_std]
#![deny(unsafe_code)]

pub mod commands;
pub mod compress;
pub mod crc;
pub mod frame;
pub mod plid;

pub use commands::{parse_hex, EslCommand, HexError, SEGMENT_BITMAP_SIZE};
pub use compress::{
    run_length_decode, CompressError, Compression, DecodeError, Encoded, MAX_RUN, MAX_SAMPLES,
};
pub use crc::crc16;
pub use frame::{
    Frame, FrameError, MAX_BODY_SIZE, MAX_FRAME_SIZE, MCU_CMD_DATA, MCU_CMD_PARAMS,
    MCU_CMD_REFRESH, PROTOCOL_DM, PROTOCOL_SEGMENT, WIDE_HEADER,
};
pub use plid::{DeviceId, BARCODE_LEN};
