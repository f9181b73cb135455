//! Radio window scheduling and two-node clock synchronization
//!
//! Platform-agnostic core of the sync firmware. It borrows the radio from an
//! external time-division arbiter one bounded window at a time and, inside
//! each window, aligns a free-running reference clock with the peer node
//! through a single sync packet.
//!
//! # Modules
//!
//! - **`config`**: protocol constants and hardware channel assignments
//! - **`role`**: TX/RX selection from the device identifier
//! - **`packet`**: the sync packet codec
//! - **`corrector`**: phase offset computation and the one-shot correction
//! - **`dispatcher`**: the window signal state machine
//! - **`engine`**: the shared context the signal callback runs in
//! - **`serializer`**: the bounded call queue and its session owner
//! - **`stats`**: lock-free counters
//!
//! Hardware is reached only through the traits in `hal-abstractions`.
//! Logging goes to `defmt` when the `defmt` feature is enabled.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

// Must come first so the logging macros are visible to every module
mod fmt;

pub mod config;
pub mod corrector;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod packet;
pub mod role;
pub mod serializer;
pub mod stats;

#[cfg(test)]
mod testing;

pub use config::SyncConfig;
pub use corrector::{CorrectionOutcome, CorrectionState, OffsetCorrector};
pub use dispatcher::{DispatchState, WindowDispatcher, WindowPeripherals};
pub use engine::{SyncEngine, WindowSchedule};
pub use error::{PacketError, SyncError};
pub use packet::SyncPacket;
pub use role::Role;
pub use serializer::{Call, CallSerializer, SessionOwner, CALL_QUEUE_DEPTH};
pub use stats::{StatsSnapshot, SyncStats};
