//! Per-device identifier

/// Source of the factory-programmed device identifier
///
/// The identifier is stable across resets and unique per chip.
pub trait DeviceIdentifier {
    fn device_id(&self) -> u64;
}
