//! Event-routing fabric
//!
//! Connects a peripheral event directly to a peripheral task so the task
//! fires within a clock cycle of the event, without the CPU. Each route
//! (channel) has one event endpoint, one task endpoint and an optional fork
//! task. Routes can be collected into groups which are switched together.

/// Hardware event a route listens to
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventSource {
    /// Compare event `n` of the TX chain timer
    ChainCompare(u8),
    /// Compare event `n` of the reference clock
    ClockCompare(u8),
}

/// Hardware task a route triggers
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskSink {
    /// Capture the reference clock into channel `n`
    ClockCapture(u8),
    /// Reset the reference clock to zero
    ClockClear,
    /// Disable every route in group `n`
    DisableGroup(u8),
    /// Start sending the packet of a ramped-up transmitter
    RadioStart,
}

/// Programmable interconnect between events and tasks
pub trait EventRouter {
    /// Bind `event` to `task` on route `channel`, replacing any previous
    /// binding and clearing the fork
    fn bind(&mut self, channel: u8, event: EventSource, task: TaskSink);

    /// Attach a second task to route `channel`
    fn fork(&mut self, channel: u8, task: TaskSink);

    /// Enable route `channel`
    fn enable(&mut self, channel: u8);

    /// Disable route `channel`
    fn disable(&mut self, channel: u8);

    /// Whether route `channel` is currently enabled
    fn is_enabled(&self, channel: u8) -> bool;

    /// Assign the routes in the `channels` bitmask to `group`
    fn set_group(&mut self, group: u8, channels: u32);

    /// Enable every route in `group` at once
    fn enable_group(&mut self, group: u8);

    /// Disable every route in `group` at once
    fn disable_group(&mut self, group: u8);
}
