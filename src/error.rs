//! Error types for the PwrShield firmware.
//!
//! Three categories, matching how each is recovered:
//!
//! | Type          | Recovery                                        |
//! |---------------|-------------------------------------------------|
//! | `DecodeError` | message discarded by the router                 |
//! | `CommsError`  | retried forever by the connectivity supervisor  |
//! | `ConfigError` | boot aborted (only reachable before the loop)   |
//!
//! All variants are `Copy` so they can be stored in events and test
//! mocks without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

/// Link, broker and publish failures.  Always transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// No WiFi credentials configured.
    NoCredentials,
    /// SSID rejected (must be 1-32 printable ASCII bytes).
    InvalidSsid,
    /// Password rejected (must be 8-64 bytes, or empty for open networks).
    InvalidPassword,
    /// Station association with the access point failed.
    AssociationFailed,
    /// Associated, but no IPv4 address has been assigned yet.
    NoAddress,
    /// Broker session could not be opened.
    ConnectFailed,
    /// Topic subscription was refused.
    SubscribeFailed,
    /// Outbound publish failed.
    PublishFailed,
    /// An open session dropped.
    ConnectionLost,
    /// Operation needs an open session.
    NotConnected,
    /// Outbound payload could not be serialised.
    Encode,
    /// Bounded retry policy gave up (tests only; production is unbounded).
    RetriesExhausted,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::AssociationFailed => write!(f, "WiFi association failed"),
            Self::NoAddress => write!(f, "no IPv4 address assigned"),
            Self::ConnectFailed => write!(f, "MQTT connect failed"),
            Self::SubscribeFailed => write!(f, "MQTT subscribe failed"),
            Self::PublishFailed => write!(f, "MQTT publish failed"),
            Self::ConnectionLost => write!(f, "MQTT connection lost"),
            Self::NotConnected => write!(f, "no MQTT session"),
            Self::Encode => write!(f, "payload encoding failed"),
            Self::RetriesExhausted => write!(f, "retry limit reached"),
        }
    }
}

impl std::error::Error for CommsError {}

// ---------------------------------------------------------------------------
// Inbound decode errors
// ---------------------------------------------------------------------------

/// Why an inbound command payload was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload is not valid JSON (or not an object).
    Syntax,
    /// No `datahold` object.
    MissingDatahold,
    /// `datahold` carries neither `powerstate` nor a reset flag.
    MissingPowerState,
    /// `powerstate` is not one of OFF / AUX / PWR / RESET.
    UnknownPowerState,
    /// Payload exceeds the configured size limit.
    Oversized,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "malformed JSON"),
            Self::MissingDatahold => write!(f, "missing datahold"),
            Self::MissingPowerState => write!(f, "missing powerstate"),
            Self::UnknownPowerState => write!(f, "unknown powerstate"),
            Self::Oversized => write!(f, "payload too large"),
        }
    }
}

impl std::error::Error for DecodeError {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// A configuration field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    InvalidSsid,
    InvalidPassword,
    InvalidPort,
    /// Broker host octet must be 1-254.
    InvalidBrokerOctet,
    /// Named topic template is empty or malformed.
    InvalidTopic(&'static str),
    /// Named timing parameter is out of range.
    InvalidTiming(&'static str),
    /// JSON document could not be parsed.
    Malformed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "wifi_ssid must be 1-32 printable ASCII bytes"),
            Self::InvalidPassword => write!(f, "wifi_password must be empty or 8-64 bytes"),
            Self::InvalidPort => write!(f, "broker_port must be non-zero"),
            Self::InvalidBrokerOctet => write!(f, "broker_host_octet must be 1-254"),
            Self::InvalidTopic(name) => write!(f, "topic '{}' is invalid", name),
            Self::InvalidTiming(name) => write!(f, "timing '{}' is out of range", name),
            Self::Malformed => write!(f, "config document is malformed"),
        }
    }
}

impl std::error::Error for ConfigError {}
