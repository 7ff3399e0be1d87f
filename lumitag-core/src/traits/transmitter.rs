//! Frame transmitter trait

use lumitag_protocol::Frame;

/// Errors reported by a frame transmitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxError {
    /// A transmission is already in progress
    Busy,
    /// The asynchronous queue has no free slot
    QueueFull,
}

/// Trait for the physical frame transmitter.
///
/// `transmit` blocks for the full duration of the transmission and owns
/// the output line while it runs; there is no mid-frame cancellation.
/// The pipeline uses the returned `Result` as its per-frame
/// failure-detection signal.
pub trait FrameTransmitter {
    /// Transmit one frame, repeating it `frame.repeats()` times.
    fn transmit(&mut self, frame: &Frame) -> Result<(), TxError>;

    /// Whether a transmission is currently in progress.
    fn is_busy(&self) -> bool;

    /// Monotonic count of frame passes put on the air.
    fn frames_sent(&self) -> u32;
}
