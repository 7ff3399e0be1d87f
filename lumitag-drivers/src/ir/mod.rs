//! Infrared transmission
//!
//! Frame bytes become 2-bit symbols; each symbol is a fixed 1.25 MHz
//! carrier burst followed by a pause whose length carries the symbol
//! value. The engine owns the output pin, its busy flag, and the frame
//! counter; nothing here is process-wide state.

pub mod engine;
pub mod queue;

pub use engine::{
    IrTransmitter, OutputPin, BURST_CYCLES, BURST_US, CARRIER_HZ, INTER_FRAME_GAP_US,
    SYMBOL_PAUSE_US, YIELD_INTERVAL_SYMBOLS,
};
pub use queue::{QueuedFrame, TxQueue, TX_QUEUE_DEPTH};
