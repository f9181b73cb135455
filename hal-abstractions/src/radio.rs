//! Radio peripheral in raw addressed packet mode

/// On-air data rate and modulation
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioMode {
    Nrf1Mbit,
    Nrf2Mbit,
    Ble1Mbit,
    Ble2Mbit,
    BleLr125Kbit,
    BleLr500Kbit,
}

impl RadioMode {
    /// Coded PHY modes end a packet on PHYEND instead of END
    pub const fn is_long_range(&self) -> bool {
        matches!(self, Self::BleLr125Kbit | Self::BleLr500Kbit)
    }
}

/// Fixed radio parameters of the sync protocol
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioSettings {
    /// Data rate and modulation
    pub mode: RadioMode,
    /// Channel offset from 2400 MHz
    pub channel: u8,
    /// Output power in dBm
    pub tx_power_dbm: i8,
    /// Base address of logical address 0
    pub base_address: u32,
    /// Prefix byte of logical address 0
    pub prefix: u8,
    /// Largest payload accepted on receive
    pub max_payload: u8,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            mode: RadioMode::Ble1Mbit,
            channel: 0,
            tx_power_dbm: 8,
            base_address: 0x58FE_811B,
            prefix: 0x6A,
            max_payload: 32,
        }
    }
}

/// Set of radio interrupt sources
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioInterrupts(u8);

impl RadioInterrupts {
    pub const NONE: Self = Self(0);
    /// Packet fully sent or received
    pub const END: Self = Self(1 << 0);
    /// Received packet passed the CRC check
    pub const CRC_OK: Self = Self(1 << 1);
    /// Address matched on receive
    pub const ADDRESS: Self = Self(1 << 2);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }
}

/// Radio peripheral controller
pub trait RadioPeripheral {
    /// Apply mode, frequency, power, address and packet format
    fn configure(&mut self, settings: &RadioSettings);

    /// Copy `payload` into the transmit buffer
    fn load_payload(&mut self, payload: &[u8]);

    /// Ramp up the transmitter without sending
    ///
    /// The buffer is read when the START task is triggered, so the payload
    /// may be loaded while ramping up. One packet is sent, then the radio
    /// disables itself.
    fn ramp_up_tx(&mut self);

    /// Ramp up and listen; with `continuous` the receiver re-arms after
    /// every packet boundary
    fn start_rx(&mut self, continuous: bool);

    /// Copy out a received payload that passed the CRC check, if any, and
    /// return its length
    fn take_received(&mut self, buf: &mut [u8]) -> Option<usize>;

    fn enable_interrupts(&mut self, sources: RadioInterrupts);

    /// Disable every interrupt source
    fn disable_interrupts(&mut self);

    /// Clear all pending events
    fn clear_events(&mut self);

    /// Hard disable; returns once the radio reports disabled
    fn disable(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_set() {
        let set = RadioInterrupts::CRC_OK.union(RadioInterrupts::ADDRESS);
        assert!(set.contains(RadioInterrupts::CRC_OK));
        assert!(set.contains(RadioInterrupts::ADDRESS));
        assert!(!set.contains(RadioInterrupts::END));
        assert_eq!(RadioInterrupts::NONE.bits(), 0);
    }

    #[test]
    fn test_long_range_modes() {
        assert!(RadioMode::BleLr125Kbit.is_long_range());
        assert!(!RadioMode::Ble1Mbit.is_long_range());
    }
}
