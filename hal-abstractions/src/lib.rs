//! Hardware abstraction traits for the radio window sync firmware
//!
//! This crate defines the traits that separate the synchronization engine
//! from the silicon it runs on. Board support crates implement them; the
//! engine in `radio-sync-core` is written only against these traits, which
//! is what lets it run under host unit tests.
//!
//! - **`arbiter`**: the external time-division arbiter and the types it
//!   exchanges with the engine (requests, signals, callback actions)
//! - **`clock`**: the free-running reference counter both nodes align to
//! - **`fabric`**: event-to-task routing without CPU involvement
//! - **`radio`**: the physical radio in raw addressed packet mode
//! - **`timer`**: the window expiry timer and the TX capture chain timer
//! - **`device`**: the immutable per-device identifier

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod arbiter;
pub mod clock;
pub mod device;
pub mod fabric;
pub mod radio;
pub mod timer;

pub use arbiter::{
    ArbiterError, ClockAccuracy, SessionId, Signal, SignalAction, WindowArbiter, WindowKind,
    WindowPriority, WindowRequest,
};
pub use clock::{ReferenceClock, Tick};
pub use device::DeviceIdentifier;
pub use fabric::{EventRouter, EventSource, TaskSink};
pub use radio::{RadioInterrupts, RadioMode, RadioPeripheral, RadioSettings};
pub use timer::{ChainTimer, ExpiryTimer};
