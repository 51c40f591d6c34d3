//! Connectivity supervisor.
//!
//! Owns the network link and the broker session and keeps both alive.
//! [`ConnectivitySupervisor::ensure_link`] blocks until a session is open,
//! subscribed and greeted, flashing the cooling output while it waits:
//!
//! ```text
//!   ┌─▶ associate ──fail──▶ association blink ─┐
//!   │      │ ok                                │
//!   │      ▼                                   │
//!   │   broker = own IP with last octet N ◀────┘ (once associated)
//!   │      │
//!   │   open ─▶ subscribe inbound ─▶ handshake ──ok──▶ link_connected
//!   │      │ fail
//!   └── retry blink
//! ```
//!
//! Every failure is treated as transient.  There is no backoff; the blink
//! patterns are the only pacing.

use std::net::Ipv4Addr;

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{
    BrokerEndpoint, BrokerPort, DelayPort, EventSink, LinkPort, OutputPort, SessionIdentity,
};
use crate::codec;
use crate::config::{BlinkPattern, ShieldConfig};
use crate::error::CommsError;
use crate::fsm::status::ControllerStatus;
use crate::pins::{Level, OutputId};
use crate::topics::{TopicRole, TopicTable};

/// Replace the last octet of `own` with `octet`.
pub fn broker_address(own: Ipv4Addr, octet: u8) -> Ipv4Addr {
    let [a, b, c, _] = own.octets();
    Ipv4Addr::new(a, b, c, octet)
}

/// Flash the cooling output `pattern.cycles` times, then put it back to the
/// level it had before.
pub fn blink(hw: &mut (impl OutputPort + DelayPort), pattern: &BlinkPattern) {
    let restore = hw.output_level(OutputId::Cooling);
    for _ in 0..pattern.cycles {
        hw.set_output(OutputId::Cooling, Level::High);
        hw.delay_ms(pattern.on_ms);
        hw.set_output(OutputId::Cooling, Level::Low);
        hw.delay_ms(pattern.off_ms);
    }
    hw.set_output(OutputId::Cooling, restore);
}

/// Pacing and bounds for reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub association_blink: BlinkPattern,
    pub retry_blink: BlinkPattern,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn from_config(config: &ShieldConfig) -> Self {
        Self {
            association_blink: config.association_blink,
            retry_blink: config.retry_blink,
            max_attempts: None,
        }
    }

    /// Give up after `attempts` failures.
    pub fn bounded(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Keeps the link and the broker session up.
pub struct ConnectivitySupervisor<L: LinkPort, M: BrokerPort> {
    link: L,
    broker: M,
    identity: SessionIdentity,
    broker_port: u16,
    broker_octet: u8,
    policy: RetryPolicy,
}

impl<L: LinkPort, M: BrokerPort> ConnectivitySupervisor<L, M> {
    pub fn new(link: L, broker: M, identity: SessionIdentity, config: &ShieldConfig) -> Self {
        Self {
            link,
            broker,
            identity,
            broker_port: config.broker_port,
            broker_octet: config.broker_host_octet,
            policy: RetryPolicy::from_config(config),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn broker(&self) -> &M {
        &self.broker
    }

    /// The live broker session.
    pub fn session(&mut self) -> &mut M {
        &mut self.broker
    }

    /// Block until a broker session is open, subscribed and has sent its
    /// handshake.  Returns the broker address.
    ///
    /// `status.link_connected` is false for the whole bring-up and true only
    /// on success.  Power state and the pending-notification flag are left
    /// alone.
    pub fn ensure_link(
        &mut self,
        status: &mut ControllerStatus,
        topics: &TopicTable,
        hw: &mut (impl OutputPort + DelayPort),
        sink: &mut impl EventSink,
    ) -> Result<Ipv4Addr, CommsError> {
        status.link_connected = false;
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            match self.try_bring_up(topics, hw) {
                Ok(broker) => {
                    status.link_connected = true;
                    info!("Supervisor: link up, broker {} (attempt {})", broker, attempts);
                    sink.emit(&AppEvent::LinkUp { broker, attempts });
                    return Ok(broker);
                }
                Err(CommsError::RetriesExhausted) => return Err(CommsError::RetriesExhausted),
                Err(e) => {
                    warn!("Supervisor: bring-up failed: {} (attempt {})", e, attempts);
                    sink.emit(&AppEvent::LinkLost(e));
                    if self.policy.exhausted(attempts) {
                        return Err(CommsError::RetriesExhausted);
                    }
                    blink(hw, &self.policy.retry_blink);
                }
            }
        }
    }

    fn try_bring_up(
        &mut self,
        topics: &TopicTable,
        hw: &mut (impl OutputPort + DelayPort),
    ) -> Result<Ipv4Addr, CommsError> {
        self.associate(hw)?;

        let own = self.link.local_ipv4().ok_or(CommsError::NoAddress)?;
        let host = broker_address(own, self.broker_octet);
        let endpoint = BrokerEndpoint {
            host,
            port: self.broker_port,
        };

        self.broker.open(endpoint, &self.identity)?;
        for topic in topics.inbound() {
            self.broker.subscribe(topic)?;
            debug!("Supervisor: subscribed {}", topic);
        }
        let hello = codec::encode_handshake()?;
        self.broker.publish(topics.get(TopicRole::Handshake), &hello)?;
        Ok(host)
    }

    fn associate(&mut self, hw: &mut (impl OutputPort + DelayPort)) -> Result<(), CommsError> {
        let mut tries: u32 = 0;
        while !self.link.is_associated() {
            tries = tries.saturating_add(1);
            match self.link.associate() {
                Ok(()) => break,
                Err(e) => {
                    warn!("Supervisor: association failed: {} (try {})", e, tries);
                    if self.policy.exhausted(tries) {
                        return Err(CommsError::RetriesExhausted);
                    }
                    blink(hw, &self.policy.association_blink);
                }
            }
        }
        Ok(())
    }
}
