//! Sync packet codec
//!
//! The only payload the engine puts on air: the reference clock tick the
//! transmitter captured at a fixed offset into its window, as a
//! little-endian `u32`. The layout is internal and unversioned.

use hal_abstractions::Tick;

use crate::error::PacketError;

/// Payload of one sync exchange
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncPacket {
    /// Transmitter's reference clock value at capture
    pub captured_tick: Tick,
}

impl SyncPacket {
    /// Encoded size in bytes
    pub const LEN: usize = 4;

    pub const fn new(captured_tick: Tick) -> Self {
        Self { captured_tick }
    }

    pub fn encode(&self) -> [u8; Self::LEN] {
        self.captured_tick.to_le_bytes()
    }

    /// Decode from a received payload; trailing bytes are ignored
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let bytes: [u8; Self::LEN] = buf
            .get(..Self::LEN)
            .and_then(|head| head.try_into().ok())
            .ok_or(PacketError::Truncated { len: buf.len() })?;
        Ok(Self::new(Tick::from_le_bytes(bytes)))
    }
}
