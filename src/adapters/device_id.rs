//! Device identity derived from the ESP32 factory MAC address.
//!
//! The id is the full 6-byte MAC in lowercase hex (`a1b2c3d4e5f6`).  It is
//! stable across reboots (factory-burned eFuse MAC) and used both as the MQTT
//! client id and as `{id}` in the device-addressed topics.

use core::fmt::Write;

/// Fixed-size device id string: 12 hex chars.
pub type DeviceIdString = heapless::String<16>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes the call writes.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    for byte in mac {
        // 12 chars always fit in 16
        let _ = write!(id, "{byte:02x}");
    }
    id
}
