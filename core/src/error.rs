//! Sync engine error types

use hal_abstractions::{ArbiterError, Tick};

/// Sync packet decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Payload shorter than a sync packet
    Truncated { len: usize },
}

impl core::fmt::Display for PacketError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Truncated { len } => write!(f, "Sync packet truncated ({} bytes)", len),
        }
    }
}

impl core::error::Error for PacketError {}

/// Sync engine operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncError {
    /// The arbiter rejected open, request or close
    Arbiter(ArbiterError),
    /// Start while a session is already open
    AlreadyRunning,
    /// Stop without an open session
    NotRunning,
    /// The call queue has no free slot
    QueueFull,
    /// A received payload could not be decoded
    Packet(PacketError),
    /// A remote tick outside `[0, modulus)`
    TickOutOfRange { tick: Tick, modulus: Tick },
    /// The TX capture chain did not complete within the spin limit
    ChainTimeout,
}

impl core::fmt::Display for SyncError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Arbiter(e) => write!(f, "{}", e),
            Self::AlreadyRunning => write!(f, "Schedule already running"),
            Self::NotRunning => write!(f, "Schedule not running"),
            Self::QueueFull => write!(f, "Call queue full"),
            Self::Packet(e) => write!(f, "{}", e),
            Self::TickOutOfRange { tick, modulus } => {
                write!(f, "Remote tick {} outside modulus {}", tick, modulus)
            }
            Self::ChainTimeout => write!(f, "Capture chain timed out"),
        }
    }
}

impl core::error::Error for SyncError {}

impl From<ArbiterError> for SyncError {
    fn from(e: ArbiterError) -> Self {
        SyncError::Arbiter(e)
    }
}

impl From<PacketError> for SyncError {
    fn from(e: PacketError) -> Self {
        SyncError::Packet(e)
    }
}
