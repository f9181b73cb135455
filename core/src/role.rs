//! Node role selection
//!
//! The two-node topology is fixed: the node whose factory identifier matches
//! the configured transmitter identifier sends sync packets, every other node
//! listens. The role is computed once at boot and never changes.

use hal_abstractions::DeviceIdentifier;

use crate::config::SyncConfig;

/// Node role in the sync exchange
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Captures its clock and sends one sync packet per window
    Tx,
    /// Listens for sync packets and corrects its clock
    Rx,
}

impl Role {
    /// Map a device identifier to a role
    pub const fn from_device_id(device_id: u64, tx_device_id: u64) -> Self {
        if device_id == tx_device_id {
            Role::Tx
        } else {
            Role::Rx
        }
    }

    /// Read the device identifier and select the role for `config`
    pub fn select<D: DeviceIdentifier>(device: &D, config: &SyncConfig) -> Self {
        let device_id = device.device_id();
        let role = Self::from_device_id(device_id, config.tx_device_id);
        info!("Device {=u64:x} selected role {}", device_id, role);
        role
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDevice;

    #[test]
    fn test_matching_id_transmits() {
        assert_eq!(Role::from_device_id(0xA5A5, 0xA5A5), Role::Tx);
        assert_eq!(Role::from_device_id(0xA5A4, 0xA5A5), Role::Rx);
    }

    #[test]
    fn test_selection_is_stable_across_restarts() {
        let config = SyncConfig {
            tx_device_id: 0x1234_5678_9ABC_DEF0,
            ..SyncConfig::default()
        };
        let tx = MockDevice(0x1234_5678_9ABC_DEF0);
        let rx = MockDevice(0x0FED_CBA9_8765_4321);

        for _ in 0..3 {
            assert_eq!(Role::select(&tx, &config), Role::Tx);
            assert_eq!(Role::select(&rx, &config), Role::Rx);
        }
    }
}
