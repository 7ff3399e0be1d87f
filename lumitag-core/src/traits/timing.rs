//! Precision timing and cooperative scheduling traits
//!
//! Symbol timing on the IR carrier is sub-microsecond; the clock trait
//! scopes the jitter-free window to a closure so that interrupt masking
//! and clock pinning are always undone, on every exit path.

/// Jitter-free timing source for carrier generation.
///
/// Implementations typically mask interrupts and pin the core clock to
/// its maximum rate for the duration of [`PrecisionClock::exclusive`],
/// restoring both afterwards. Each exclusive section covers exactly one
/// burst+pause pair, bounding the latency imposed on the rest of the
/// system.
pub trait PrecisionClock {
    /// Run `f` inside the jitter-free section. Prior interrupt and clock
    /// state is restored when `f` returns, normally or otherwise.
    fn exclusive<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R;

    /// Busy-wait half of the carrier period (400 ns at 1.25 MHz).
    fn delay_half_carrier(&mut self);

    /// Busy-wait a whole number of microseconds.
    fn delay_us(&mut self, us: u32);
}

/// Explicit cooperative suspension point.
///
/// Long transmissions call [`CoopYield::yield_now`] every few dozen
/// symbols and between frames so housekeeping work (e.g. the network
/// stack) is not starved. Preemptive targets can use [`NoopYield`].
pub trait CoopYield {
    /// Let other pending cooperative work run.
    fn yield_now(&mut self);
}

/// No-op yield for preemptively scheduled targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopYield;

impl CoopYield for NoopYield {
    fn yield_now(&mut self) {}
}
