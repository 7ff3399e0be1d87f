//! Hardware abstraction traits
//!
//! These traits define the interface between the transmission pipeline
//! and hardware-specific implementations.

pub mod timing;
pub mod transmitter;

pub use timing::{CoopYield, NoopYield, PrecisionClock};
pub use transmitter::{FrameTransmitter, TxError};
