//! WiFi station-mode adapter.
//!
//! Implements [`LinkPort`], the hexagonal boundary for network association.
//! Retry pacing is not this adapter's business: every call to
//! [`associate`](LinkPort::associate) is exactly one attempt, and the
//! [supervisor](crate::supervisor) decides when to try again.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via
//!   `esp_idf_svc::wifi::BlockingWifi`.
//! - **all other targets**: simulation stubs for host-side runs.

use std::net::Ipv4Addr;

use log::{info, warn};

use crate::app::ports::LinkPort;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// 1-32 printable ASCII bytes.
pub fn validate_ssid(ssid: &str) -> Result<(), CommsError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(CommsError::InvalidSsid);
    }
    Ok(())
}

/// Empty (open network) or 8-64 bytes (WPA2).
pub fn validate_password(password: &str) -> Result<(), CommsError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(CommsError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim_associated: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_attempts: u32,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        let wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), nvs)?, sysloop)?;
        Ok(Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            sim_associated: false,
            sim_attempts: 0,
        }
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|()| CommsError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|()| CommsError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_associate(&mut self) -> Result<(), CommsError> {
        let started = self.wifi.is_started().unwrap_or(false);
        if !started {
            let auth_method = if self.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            };
            self.wifi
                .set_configuration(&Configuration::Client(ClientConfiguration {
                    ssid: self
                        .ssid
                        .as_str()
                        .try_into()
                        .map_err(|_| CommsError::InvalidSsid)?,
                    password: self
                        .password
                        .as_str()
                        .try_into()
                        .map_err(|_| CommsError::InvalidPassword)?,
                    auth_method,
                    ..Default::default()
                }))
                .map_err(|e| {
                    warn!("WiFi: set_configuration failed: {e}");
                    CommsError::AssociationFailed
                })?;
            self.wifi.start().map_err(|e| {
                warn!("WiFi: start failed: {e}");
                CommsError::AssociationFailed
            })?;
        } else if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect before retry failed: {e}");
        }

        self.wifi.connect().map_err(|e| {
            warn!("WiFi: connect failed: {e}");
            CommsError::AssociationFailed
        })?;
        self.wifi.wait_netif_up().map_err(|e| {
            warn!("WiFi: netif up failed: {e}");
            CommsError::NoAddress
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_associate(&mut self) -> Result<(), CommsError> {
        self.sim_associated = true;
        info!("WiFi(sim): associated with '{}' (attempt {})", self.ssid, self.sim_attempts);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_associated(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_associated(&self) -> bool {
        self.sim_associated
    }

    #[cfg(target_os = "espidf")]
    fn platform_ipv4(&self) -> Option<Ipv4Addr> {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip)
            .filter(|ip| !ip.is_unspecified())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_ipv4(&self) -> Option<Ipv4Addr> {
        self.sim_associated.then_some(Ipv4Addr::new(192, 168, 1, 77))
    }

    /// Simulation: forget the association, as if the AP went away.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_association(&mut self) {
        self.sim_associated = false;
        warn!("WiFi(sim): association dropped");
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// LinkPort
// ───────────────────────────────────────────────────────────────

impl LinkPort for WifiAdapter {
    fn is_associated(&self) -> bool {
        self.platform_is_associated()
    }

    fn associate(&mut self) -> Result<(), CommsError> {
        if self.ssid.is_empty() {
            return Err(CommsError::NoCredentials);
        }
        #[cfg(not(target_os = "espidf"))]
        {
            self.sim_attempts = self.sim_attempts.wrapping_add(1);
        }

        info!("WiFi: associating with '{}'", self.ssid);
        self.platform_associate()?;
        info!("WiFi: associated, address {:?}", self.platform_ipv4());
        Ok(())
    }

    fn local_ipv4(&self) -> Option<Ipv4Addr> {
        self.platform_ipv4()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
