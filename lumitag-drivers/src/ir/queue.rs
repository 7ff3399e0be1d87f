//! Bounded transmission queue
//!
//! The asynchronous path copies a frame's bytes into an owned entry and
//! holds it until the background drain transmits it. The queue is small
//! and fixed; insertion fails fast when full instead of blocking.

use heapless::{Deque, Vec};

use lumitag_core::traits::TxError;
use lumitag_protocol::{Frame, MAX_FRAME_SIZE};

/// Queue capacity in frames
pub const TX_QUEUE_DEPTH: usize = 4;

/// An owned copy of a frame awaiting background transmission.
#[derive(Debug, Clone)]
pub struct QueuedFrame {
    bytes: Vec<u8, MAX_FRAME_SIZE>,
    repeats: u16,
}

impl QueuedFrame {
    fn from_frame(frame: &Frame) -> Self {
        let mut bytes = Vec::new();
        // Same capacity as the source frame; cannot overflow
        let _ = bytes.extend_from_slice(frame.as_bytes());
        Self {
            bytes,
            repeats: frame.repeats(),
        }
    }

    /// The queued frame bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Repeat count for transmission.
    pub fn repeats(&self) -> u16 {
        self.repeats
    }
}

/// FIFO of frames awaiting background transmission.
pub struct TxQueue {
    entries: Deque<QueuedFrame, TX_QUEUE_DEPTH>,
}

impl Default for TxQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TxQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    /// Copy `frame` into the queue; fails fast when full.
    pub fn push(&mut self, frame: &Frame) -> Result<(), TxError> {
        self.entries
            .push_back(QueuedFrame::from_frame(frame))
            .map_err(|_| TxError::QueueFull)
    }

    /// Take the oldest entry; its storage is released with the return value.
    pub fn pop(&mut self) -> Option<QueuedFrame> {
        self.entries.pop_front()
    }

    /// Number of queued frames.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether another push would fail.
    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }
}
