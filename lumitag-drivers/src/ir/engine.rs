//! Carrier burst signal engine
//!
//! Every frame byte carries four 2-bit symbols, most significant pair
//! first. A symbol is one fixed-length carrier burst followed by a
//! pause; the pause length alone encodes the symbol value. Burst and
//! pause timing is tight enough that both run inside a single
//! [`PrecisionClock::exclusive`] section, with cooperative yields
//! between sections so the rest of the system keeps running.

use lumitag_core::traits::{CoopYield, FrameTransmitter, PrecisionClock, TxError};
use lumitag_protocol::Frame;

use super::queue::TxQueue;

/// Carrier frequency in Hz.
pub const CARRIER_HZ: u32 = 1_250_000;

/// Burst duration in microseconds.
pub const BURST_US: u32 = 39;

/// Full carrier cycles per burst.
pub const BURST_CYCLES: u32 = BURST_US * CARRIER_HZ / 1_000_000;

/// Pause length per 2-bit symbol value, in microseconds.
pub const SYMBOL_PAUSE_US: [u32; 4] = [56, 237, 117, 178];

/// Idle gap after each frame repeat, in microseconds.
pub const INTER_FRAME_GAP_US: u32 = 2000;

/// Symbols transmitted between cooperative yields.
pub const YIELD_INTERVAL_SYMBOLS: usize = 32;

/// Push-pull output driving the IR LED.
///
/// Infallible by design; the transmit loop has no way to recover from a
/// pin fault mid-burst, so fallible pins must be adapted before use.
pub trait OutputPin {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

/// Bit-banged IR transmission engine.
///
/// Owns the output pin, the busy flag, the lifetime frame counter, and
/// a bounded queue for background transmission. One engine per LED;
/// there is no shared state between instances.
pub struct IrTransmitter<P, C, Y> {
    pin: P,
    clock: C,
    yielder: Y,
    busy: bool,
    draining: bool,
    frames_sent: u32,
    queue: TxQueue,
}

impl<P, C, Y> IrTransmitter<P, C, Y>
where
    P: OutputPin,
    C: PrecisionClock,
    Y: CoopYield,
{
    /// Create an engine and drive the pin to its idle (low) state.
    pub fn new(mut pin: P, clock: C, yielder: Y) -> Self {
        pin.set_low();
        Self {
            pin,
            clock,
            yielder,
            busy: false,
            draining: false,
            frames_sent: 0,
            queue: TxQueue::new(),
        }
    }

    /// Transmit raw frame bytes `repeats` times.
    ///
    /// Rejects reentrant calls with [`TxError::Busy`]. Each symbol's
    /// burst and pause run inside one exclusive clock section; the
    /// inter-repeat gap runs outside so it stays preemptible.
    pub fn transmit_frame(&mut self, bytes: &[u8], repeats: u16) -> Result<(), TxError> {
        if self.busy {
            return Err(TxError::Busy);
        }
        self.busy = true;

        let symbol_count = bytes.len() * 4;
        for _ in 0..repeats {
            for index in 0..symbol_count {
                let byte = bytes[index >> 2];
                let shift = 6 - ((index & 0b11) << 1);
                let symbol = (byte >> shift) & 0b11;

                let pin = &mut self.pin;
                self.clock.exclusive(|clock| {
                    carrier_burst(pin, clock);
                    clock.delay_us(SYMBOL_PAUSE_US[symbol as usize]);
                });

                if index % YIELD_INTERVAL_SYMBOLS == 0 {
                    self.yielder.yield_now();
                }
            }

            // Closing burst terminates the final pause
            let pin = &mut self.pin;
            self.clock.exclusive(|clock| carrier_burst(pin, clock));

            self.clock.delay_us(INTER_FRAME_GAP_US);
            self.yielder.yield_now();
        }

        self.frames_sent = self.frames_sent.wrapping_add(u32::from(repeats));
        self.busy = false;
        Ok(())
    }

    /// Transmit a slice of frames back to back, yielding between them.
    pub fn transmit_all(&mut self, frames: &[Frame]) -> Result<(), TxError> {
        for frame in frames {
            self.transmit_frame(frame.as_bytes(), frame.repeats())?;
            self.yielder.yield_now();
        }
        Ok(())
    }

    /// Emit a bare carrier for `cycles` full periods.
    ///
    /// Diagnostic aid for checking LED wiring and carrier frequency
    /// with a scope; carries no frame data.
    pub fn carrier_test(&mut self, cycles: u32) {
        let pin = &mut self.pin;
        self.clock.exclusive(|clock| {
            for _ in 0..cycles {
                pin.set_high();
                clock.delay_half_carrier();
                pin.set_low();
                clock.delay_half_carrier();
            }
        });
    }

    /// Enqueue a frame for later transmission by [`Self::service_queue`].
    pub fn queue_frame(&mut self, frame: &Frame) -> Result<(), TxError> {
        self.queue.push(frame)
    }

    /// Transmit at most one queued frame.
    ///
    /// Returns whether entries remain. Reentrant calls and calls while
    /// a foreground transmission is running are no-ops so a periodic
    /// caller never interleaves two frames.
    pub fn service_queue(&mut self) -> bool {
        if self.draining || self.busy {
            return !self.queue.is_empty();
        }
        self.draining = true;
        if let Some(entry) = self.queue.pop() {
            // Busy was checked above, so this cannot fail
            let _ = self.transmit_frame(entry.bytes(), entry.repeats());
        }
        self.draining = false;
        !self.queue.is_empty()
    }

    /// Number of frames waiting in the queue.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Whether a transmission is currently in progress.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Total frame repetitions transmitted over this engine's lifetime.
    pub fn frames_sent(&self) -> u32 {
        self.frames_sent
    }

    /// Consume the engine, returning the pin, clock, and yielder.
    pub fn release(self) -> (P, C, Y) {
        (self.pin, self.clock, self.yielder)
    }
}

impl<P, C, Y> FrameTransmitter for IrTransmitter<P, C, Y>
where
    P: OutputPin,
    C: PrecisionClock,
    Y: CoopYield,
{
    fn transmit(&mut self, frame: &Frame) -> Result<(), TxError> {
        self.transmit_frame(frame.as_bytes(), frame.repeats())
    }

    fn is_busy(&self) -> bool {
        self.busy
    }

    fn frames_sent(&self) -> u32 {
        self.frames_sent
    }
}

/// One carrier burst: [`BURST_CYCLES`] full on/off periods.
///
/// Must run inside an exclusive clock section; half-period jitter
/// detunes the carrier away from the tag's demodulator.
fn carrier_burst(pin: &mut impl OutputPin, clock: &mut impl PrecisionClock) {
    for _ in 0..BURST_CYCLES {
        pin.set_high();
        clock.delay_half_carrier();
        pin.set_low();
        clock.delay_half_carrier();
    }
}
