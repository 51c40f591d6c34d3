//! System configuration parameters
//!
//! Everything the firmware needs from the outside world, resolved once at
//! boot.  Secrets default to placeholders and are overridden at build time
//! through `PWRSHIELD_*` environment variables (see [`ShieldConfig::from_build_env`]).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// On/off flash of the cooling output used as a visible "still trying" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlinkPattern {
    /// Number of on/off cycles.
    pub cycles: u8,
    /// Time the output is held high per cycle (ms).
    pub on_ms: u32,
    /// Time the output is held low per cycle (ms).
    pub off_ms: u32,
}

impl BlinkPattern {
    /// Total wall time of one pattern run.
    pub fn duration_ms(&self) -> u32 {
        u32::from(self.cycles) * (self.on_ms + self.off_ms)
    }
}

/// Topic templates.  `{id}` is replaced by the device id at boot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicTemplates {
    /// Broadcast commands for every shield.
    pub command: String,
    /// Commands addressed to this shield only.
    pub device_command: String,
    /// Liveness probes.
    pub ping: String,
    /// Start-up handshake, sent once per (re)connect.
    pub handshake: String,
    /// Power state change notifications.
    pub state_notify: String,
    /// Probe replies.
    pub pong: String,
}

impl Default for TopicTemplates {
    fn default() -> Self {
        Self {
            command: "pwr/all/cup".into(),
            device_command: "pwr/{id}/cup".into(),
            ping: "pwr/all/ping".into(),
            handshake: "ask/pwr/all/cup".into(),
            state_notify: "ask/pwr/all/sup".into(),
            pong: "ask/pwr/{id}/pong".into(),
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShieldConfig {
    // --- WiFi ---
    pub wifi_ssid: String,
    /// Empty for open networks.
    pub wifi_password: String,

    // --- Broker ---
    pub broker_port: u16,
    pub broker_user: String,
    pub broker_password: String,
    /// The broker lives on the station's subnet at this host octet.
    pub broker_host_octet: u8,

    // --- Topics ---
    pub topics: TopicTemplates,

    // --- Retry indication ---
    /// Flashed while WiFi association is pending.
    pub association_blink: BlinkPattern,
    /// Flashed between broker (re)connect attempts.
    pub retry_blink: BlinkPattern,

    // --- Loop ---
    /// Pause after a discarded command payload (ms).
    pub decode_error_pause_ms: u32,
    /// Pause at the end of every control cycle (ms).  Keeps the idle task fed.
    pub cycle_pause_ms: u32,
    /// Inbound messages handled per cycle before moving on.
    pub max_inbound_per_cycle: u8,
    /// Command payloads above this size are dropped.  Pings are exempt.
    pub max_payload_bytes: usize,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: "pwrshield".into(),
            wifi_password: String::new(),

            broker_port: 1883,
            broker_user: "mqtt".into(),
            broker_password: String::new(),
            broker_host_octet: 254,

            topics: TopicTemplates::default(),

            association_blink: BlinkPattern { cycles: 6, on_ms: 250, off_ms: 250 },
            retry_blink: BlinkPattern { cycles: 4, on_ms: 500, off_ms: 500 },

            decode_error_pause_ms: 200,
            cycle_pause_ms: 10,
            max_inbound_per_cycle: 8,
            max_payload_bytes: 512,
        }
    }
}

impl ShieldConfig {
    /// Factory defaults with secrets taken from the build environment.
    pub fn from_build_env() -> Self {
        let mut cfg = Self::default();
        if let Some(ssid) = option_env!("PWRSHIELD_WIFI_SSID") {
            cfg.wifi_ssid = ssid.into();
        }
        if let Some(pass) = option_env!("PWRSHIELD_WIFI_PASSWORD") {
            cfg.wifi_password = pass.into();
        }
        if let Some(user) = option_env!("PWRSHIELD_MQTT_USER") {
            cfg.broker_user = user.into();
        }
        if let Some(pass) = option_env!("PWRSHIELD_MQTT_PASSWORD") {
            cfg.broker_password = pass.into();
        }
        cfg
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(doc).map_err(|_| ConfigError::Malformed)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ssid_ok = !self.wifi_ssid.is_empty()
            && self.wifi_ssid.len() <= 32
            && self.wifi_ssid.bytes().all(|b| (0x20..=0x7E).contains(&b));
        if !ssid_ok {
            return Err(ConfigError::InvalidSsid);
        }
        let pass_len = self.wifi_password.len();
        if pass_len != 0 && !(8..=64).contains(&pass_len) {
            return Err(ConfigError::InvalidPassword);
        }
        if self.broker_port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.broker_host_octet == 0 || self.broker_host_octet == 255 {
            return Err(ConfigError::InvalidBrokerOctet);
        }

        let t = &self.topics;
        for (name, topic) in [
            ("command", &t.command),
            ("device_command", &t.device_command),
            ("ping", &t.ping),
            ("handshake", &t.handshake),
            ("state_notify", &t.state_notify),
            ("pong", &t.pong),
        ] {
            if topic.is_empty() || topic.contains(['#', '+']) {
                return Err(ConfigError::InvalidTopic(name));
            }
        }

        if self.association_blink.cycles == 0 {
            return Err(ConfigError::InvalidTiming("association_blink.cycles"));
        }
        if self.retry_blink.cycles == 0 {
            return Err(ConfigError::InvalidTiming("retry_blink.cycles"));
        }
        if self.max_inbound_per_cycle == 0 {
            return Err(ConfigError::InvalidTiming("max_inbound_per_cycle"));
        }
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::InvalidTiming("max_payload_bytes"));
        }
        Ok(())
    }
}
