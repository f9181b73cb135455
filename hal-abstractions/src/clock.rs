//! Reference clock
//!
//! A free-running hardware counter shared as the time base of both nodes.
//! It counts from zero up to `modulus - 1` and wraps. Compare and capture
//! channels are numbered by the implementation; channel 0 is reserved for
//! the wrap compare.

/// One reference clock tick (1 µs on the reference board)
pub type Tick = u32;

/// Free-running counter with compare and capture channels
pub trait ReferenceClock {
    /// Start counting, wrapping to zero when `modulus` is reached
    ///
    /// Expects a stopped clock.
    fn start(&mut self, modulus: Tick);

    /// Stop counting, keeping the current value
    fn stop(&mut self);

    /// Reset the counter to zero
    fn clear(&mut self);

    /// Load a compare channel; its compare event fires when the counter
    /// reaches `value`
    fn set_compare(&mut self, channel: u8, value: Tick);

    /// Capture the current counter value into `channel` and return it
    fn capture(&mut self, channel: u8) -> Tick;

    /// Read the value last captured (or compared) on `channel`
    fn read(&self, channel: u8) -> Tick;
}
