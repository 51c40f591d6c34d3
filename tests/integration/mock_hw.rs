//! Mock adapters for integration tests.
//!
//! The board records every output write together with the virtual time it
//! happened at.  Time only moves when something calls `delay_ms` (or a test
//! calls [`MockBoard::advance`]), so sequence timing is exact.

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use pwrshield::app::events::AppEvent;
use pwrshield::app::ports::{
    BrokerEndpoint, BrokerPort, ClockPort, DelayPort, EventSink, InboundMessage, InputPort,
    LinkPort, OutputPort, SessionIdentity,
};
use pwrshield::error::CommsError;
use pwrshield::pins::{InputId, Level, OutputId};

// ── Board ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputWrite {
    pub output: OutputId,
    pub level: Level,
    pub at_ms: u64,
}

pub struct MockBoard {
    levels: [Level; OutputId::COUNT],
    pub inputs: [Level; InputId::COUNT],
    pub writes: Vec<OutputWrite>,
    pub now_ms: u64,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self {
            levels: [Level::Low; OutputId::COUNT],
            inputs: [Level::High; InputId::COUNT],
            writes: Vec::new(),
            now_ms: 0,
        }
    }

    pub fn level(&self, id: OutputId) -> Level {
        self.levels[id as usize]
    }

    pub fn levels(&self) -> [Level; OutputId::COUNT] {
        self.levels
    }

    /// Hold an active-low input asserted or released.
    pub fn press(&mut self, id: InputId, asserted: bool) {
        self.inputs[id as usize] = Level::from(!asserted);
    }

    pub fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Writes to one output, in order.
    pub fn writes_to(&self, id: OutputId) -> Vec<OutputWrite> {
        self.writes.iter().copied().filter(|w| w.output == id).collect()
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputPort for MockBoard {
    fn set_output(&mut self, id: OutputId, level: Level) {
        self.levels[id as usize] = level;
        self.writes.push(OutputWrite {
            output: id,
            level,
            at_ms: self.now_ms,
        });
    }

    fn output_level(&self, id: OutputId) -> Level {
        self.levels[id as usize]
    }
}

impl InputPort for MockBoard {
    fn input_level(&mut self, id: InputId) -> Level {
        self.inputs[id as usize]
    }
}

impl DelayPort for MockBoard {
    fn delay_ms(&mut self, ms: u32) {
        self.now_ms += u64::from(ms);
    }
}

impl ClockPort for MockBoard {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

// ── Link ──────────────────────────────────────────────────────

pub struct MockLink {
    pub associated: bool,
    /// Number of `associate` calls that fail before one succeeds.
    pub failures_left: u32,
    pub address: Option<Ipv4Addr>,
    pub associate_calls: u32,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new() -> Self {
        Self {
            associated: false,
            failures_left: 0,
            address: Some(Ipv4Addr::new(192, 168, 1, 42)),
            associate_calls: 0,
        }
    }

    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: times,
            ..Self::new()
        }
    }
}

impl LinkPort for MockLink {
    fn is_associated(&self) -> bool {
        self.associated
    }

    fn associate(&mut self) -> Result<(), CommsError> {
        self.associate_calls += 1;
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(CommsError::AssociationFailed);
        }
        self.associated = true;
        Ok(())
    }

    fn local_ipv4(&self) -> Option<Ipv4Addr> {
        if self.associated { self.address } else { None }
    }
}

// ── Broker ────────────────────────────────────────────────────

pub struct MockBroker {
    pub open: bool,
    pub endpoints: Vec<BrokerEndpoint>,
    pub client_ids: Vec<String>,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, Vec<u8>)>,
    pub inbox: VecDeque<InboundMessage>,
    pub open_failures_left: u32,
    pub publish_failures_left: u32,
    /// Returned by the next `poll`, once.
    pub poll_error: Option<CommsError>,
}

#[allow(dead_code)]
impl MockBroker {
    pub fn new() -> Self {
        Self {
            open: false,
            endpoints: Vec::new(),
            client_ids: Vec::new(),
            subscriptions: Vec::new(),
            published: Vec::new(),
            inbox: VecDeque::new(),
            open_failures_left: 0,
            publish_failures_left: 0,
            poll_error: None,
        }
    }

    pub fn inject(&mut self, topic: &str, payload: &[u8]) {
        self.inbox.push_back(InboundMessage::new(topic, payload));
    }

    /// Payloads published on `topic`, oldest first.
    pub fn published_on(&self, topic: &str) -> Vec<Vec<u8>> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn open_calls(&self) -> usize {
        self.endpoints.len()
    }
}

impl BrokerPort for MockBroker {
    fn open(&mut self, endpoint: BrokerEndpoint, identity: &SessionIdentity) -> Result<(), CommsError> {
        self.endpoints.push(endpoint);
        self.client_ids.push(identity.client_id.clone());
        if self.open_failures_left > 0 {
            self.open_failures_left -= 1;
            self.open = false;
            return Err(CommsError::ConnectFailed);
        }
        self.open = true;
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        if !self.open {
            return Err(CommsError::NotConnected);
        }
        self.subscriptions.push(topic.to_owned());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        if !self.open {
            return Err(CommsError::NotConnected);
        }
        if self.publish_failures_left > 0 {
            self.publish_failures_left -= 1;
            self.open = false;
            return Err(CommsError::PublishFailed);
        }
        self.published.push((topic.to_owned(), payload.to_vec()));
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<InboundMessage>, CommsError> {
        if let Some(e) = self.poll_error.take() {
            self.open = false;
            return Err(e);
        }
        if !self.open {
            return Err(CommsError::NotConnected);
        }
        Ok(self.inbox.pop_front())
    }
}

// ── Event sink ────────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
