//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller / PowerStateMachine / Supervisor
//! ```
//!
//! Driven adapters (GPIO board, WiFi, MQTT, event sinks) implement these
//! traits.  The domain consumes them via generics, so none of it touches
//! ESP-IDF directly and every timing-sensitive path can be exercised with a
//! fake clock.

use std::net::Ipv4Addr;

use crate::error::CommsError;
use crate::pins::{InputId, Level, OutputId};

// ───────────────────────────────────────────────────────────────
// Board ports (GPIO + time)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the sequencer drives outputs through this.
pub trait OutputPort {
    /// Drive `id` to `level`.  Write failures are the adapter's to log;
    /// a sequence never aborts half-way.
    fn set_output(&mut self, id: OutputId, level: Level);

    /// Last level written to `id`.
    fn output_level(&self, id: OutputId) -> Level;
}

/// Read-side port for the polled trigger inputs.
pub trait InputPort {
    /// Raw line level.
    fn input_level(&mut self, id: InputId) -> Level;

    /// Triggers are active-low.
    fn is_asserted(&mut self, id: InputId) -> bool {
        self.input_level(id) == Level::Low
    }
}

/// Blocking delay.  Tests inject a fake that advances a virtual clock.
pub trait DelayPort {
    fn delay_ms(&mut self, ms: u32);
}

/// Monotonic milliseconds since boot.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

/// Everything the control loop needs from the board in one bound.
pub trait Board: OutputPort + InputPort + DelayPort + ClockPort {}

impl<T: OutputPort + InputPort + DelayPort + ClockPort> Board for T {}

// ───────────────────────────────────────────────────────────────
// Network ports
// ───────────────────────────────────────────────────────────────

/// Station-mode network association (WiFi).
pub trait LinkPort {
    /// Whether the station is currently associated and has an address.
    fn is_associated(&self) -> bool;

    /// Attempt one association with the configured credentials.
    fn associate(&mut self) -> Result<(), CommsError>;

    /// Address assigned to this station, if any.
    fn local_ipv4(&self) -> Option<Ipv4Addr>;
}

/// Where the broker lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerEndpoint {
    pub host: Ipv4Addr,
    pub port: u16,
}

/// Credentials presented when opening a broker session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub client_id: String,
    pub user: String,
    pub password: String,
}

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Publish/subscribe session with the message broker.
pub trait BrokerPort {
    /// Open a fresh session, replacing any previous one.
    fn open(&mut self, endpoint: BrokerEndpoint, identity: &SessionIdentity) -> Result<(), CommsError>;

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError>;

    /// Non-blocking check for one inbound message.
    ///
    /// `Err` means the session is gone and the supervisor must rebuild it.
    fn poll(&mut self) -> Result<Option<InboundMessage>, CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
