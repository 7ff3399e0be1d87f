//! Transmission pipeline
//!
//! Sequences the frames that make up one logical operation. Image updates
//! are multi-frame jobs with retry (see [`update`]); everything else is a
//! single terminated frame dispatched through [`send_command`].

pub mod update;

pub use update::{
    update_image, ImageRequest, UpdateError, UpdateJob, UpdateStage, DATA_CHUNK_SIZE,
    MAX_DATA_FRAMES, MAX_JOB_FRAMES, MAX_PAGE, RETRY_ATTEMPTS, RETRY_BACKOFF_MS, WAKE_REPEATS,
};

use lumitag_protocol::{DeviceId, EslCommand, FrameError};

use crate::traits::{FrameTransmitter, TxError};

/// Errors from single-frame command dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// The command could not be encoded into a frame
    Frame(FrameError),
    /// The transmitter rejected the frame
    Transmit(TxError),
}

/// Encode a single-frame command and transmit it.
pub fn send_command<T: FrameTransmitter>(
    command: &EslCommand<'_>,
    plid: &DeviceId,
    wide: bool,
    tx: &mut T,
) -> Result<(), CommandError> {
    let frame = command.to_frame(plid, wide).map_err(CommandError::Frame)?;
    tx.transmit(&frame).map_err(CommandError::Transmit)
}
