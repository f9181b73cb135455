//! Sync protocol configuration

use hal_abstractions::{ClockAccuracy, RadioSettings, Tick, WindowPriority, WindowRequest};

use crate::role::Role;

/// Hardware channel assignments used by the engine
///
/// Clock compare channel 0 is taken by the wrap compare of the reference
/// clock itself.
pub mod resources {
    /// Clock channel the TX chain captures into
    pub const CHAIN_CAPTURE_CHANNEL: u8 = 1;
    /// Clock compare channel of the one-shot correction
    pub const CORRECTION_CHANNEL: u8 = 2;
    /// Clock channel the corrector captures the local tick into
    pub const LOCAL_CAPTURE_CHANNEL: u8 = 3;
    /// Route: chain timer compare 0 -> clock capture
    pub const CAPTURE_ROUTE: u8 = 0;
    /// Route: correction compare -> clock clear, fork -> disable own group
    pub const CORRECTION_ROUTE: u8 = 1;
    /// Route: chain timer compare 1 -> radio start
    pub const RADIO_START_ROUTE: u8 = 2;
    /// Group holding only the correction route
    pub const CORRECTION_GROUP: u8 = 0;
}

/// Synchronization engine configuration
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SyncConfig {
    /// Reference clock modulus `M` in ticks
    pub modulus: Tick,
    /// Calibrated end-to-end chain delay `D` in ticks
    pub chain_delay: Tick,
    /// Chain timer delay from window start to the TX clock capture
    pub capture_delay: Tick,
    /// Chain timer delay from window start to the radio start; the gap after
    /// `capture_delay` is the CPU's time to write the payload
    pub radio_start_delay: Tick,
    /// Expiry fires this long before the window ends (µs)
    pub guard_margin_us: u32,
    /// Window length of the transmitting node (µs)
    pub tx_window_us: u32,
    /// Window length of the receiving node (µs)
    pub rx_window_us: u32,
    /// Distance between consecutive window starts (µs)
    pub window_distance_us: u32,
    /// How long an Earliest request may wait for a slot (µs)
    pub earliest_timeout_us: u32,
    /// Priority of every window request
    pub priority: WindowPriority,
    /// Clock accuracy of every window request
    pub clock_accuracy: ClockAccuracy,
    /// Polls of the chain timer before the TX capture is abandoned
    pub chain_spin_limit: u32,
    /// Device identifier of the transmitting node
    pub tx_device_id: u64,
    /// Radio parameters of the sync packet exchange
    pub radio: RadioSettings,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            modulus: 1000,
            chain_delay: 103,
            capture_delay: 40, // radio ramp-up
            radio_start_delay: 50,
            guard_margin_us: 50,
            tx_window_us: 5_000,
            rx_window_us: 90_000,
            window_distance_us: 100_000,
            earliest_timeout_us: 1_000_000,
            priority: WindowPriority::Normal,
            clock_accuracy: ClockAccuracy::NoGuarantee,
            chain_spin_limit: 10_000,
            tx_device_id: 0,
            radio: RadioSettings::default(),
        }
    }
}

impl SyncConfig {
    /// Window length owned by `role`
    pub fn window_length_us(&self, role: Role) -> u32 {
        match role {
            Role::Tx => self.tx_window_us,
            Role::Rx => self.rx_window_us,
        }
    }

    /// Offset of the expiry signal from window start
    pub fn expiry_after_us(&self, role: Role) -> u32 {
        self.window_length_us(role)
            .saturating_sub(self.guard_margin_us)
    }

    /// Request used to open a schedule and to recover from cancellation
    pub fn earliest_request(&self, role: Role) -> WindowRequest {
        WindowRequest::earliest(self.window_length_us(role), self.earliest_timeout_us)
            .with_priority(self.priority)
            .with_clock(self.clock_accuracy)
    }

    /// Request chained from every expiring window
    pub fn next_request(&self, role: Role) -> WindowRequest {
        WindowRequest::normal(self.window_length_us(role), self.window_distance_us)
            .with_priority(self.priority)
            .with_clock(self.clock_accuracy)
    }
}
