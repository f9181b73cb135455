//! Device identifier of the nRF52840
//!
//! The FICR holds a factory-programmed 64-bit `DEVICEID`, stable across
//! resets and unique per chip. The sync role is derived from it.
//!
//! # Usage
//!
//! ```no_run
//! let id = device_id::FicrDeviceId.device_id();
//! info!("Device ID: {=u64:x}", id);
//! ```

use embassy_nrf::pac;
use hal_abstractions::DeviceIdentifier;

/// Reads `FICR.DEVICEID[0..2]`
#[derive(Clone, Copy, Default)]
pub struct FicrDeviceId;

impl DeviceIdentifier for FicrDeviceId {
    fn device_id(&self) -> u64 {
        let low = pac::FICR.deviceid(0).read() as u64;
        let high = pac::FICR.deviceid(1).read() as u64;
        (high << 32) | low
    }
}
