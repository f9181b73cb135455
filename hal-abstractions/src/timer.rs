//! Window timers

use crate::clock::Tick;

/// Timer that raises the `TimerExpiry` signal before the window ends
///
/// On the reference board this is the arbiter's own timer, restarted from
/// zero at every window start.
pub trait ExpiryTimer {
    /// Raise `TimerExpiry` `after_us` microseconds into the window
    fn arm_expiry(&mut self, after_us: u32);

    /// Cancel the expiry and clear its pending event
    fn disarm_expiry(&mut self);
}

/// One-shot timer that times the TX capture chain
///
/// Compare event 0 is routed through the fabric to the reference clock
/// capture task, compare event 1 to the radio start task. The timer stops
/// itself at compare 1.
pub trait ChainTimer {
    /// Stop and clear the timer and load both compare delays
    fn prime(&mut self, capture_at: Tick, start_at: Tick);

    /// Start counting
    fn fire(&mut self);

    /// Whether compare event 0 has fired since the last `prime`
    fn is_captured(&self) -> bool;

    /// Stop the timer and clear its events
    fn reset(&mut self);
}
