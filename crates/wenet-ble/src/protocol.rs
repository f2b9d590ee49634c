//! GATT identifiers used by Wenet beacons

use uuid::Uuid;

pub use wenet_core::{WENET_SENSOR_CHARACTERISTIC_UUID, WENET_SERVICE_UUID};

/// Bluetooth base UUID that 16-bit assigned numbers expand into
const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

/// Expand a 16-bit assigned number to a full UUID
pub const fn short_uuid(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | ((short as u128) << 96))
}

/// Environmental Sensing Service
pub const ESS_SERVICE_UUID: Uuid = short_uuid(0x181A);

/// Characteristic User Description descriptor
pub const CHARACTERISTIC_USER_DESCRIPTION_UUID: Uuid = short_uuid(0x2901);
