//! MQTT broker adapter.
//!
//! Implements [`BrokerPort`] on top of `esp_idf_svc::mqtt::client`.  The
//! ESP-IDF client delivers events on its own connection object, so
//! [`open`](BrokerPort::open) spawns an `mqtt-rx` thread that drains it and
//! forwards complete messages over a `std::sync::mpsc` channel.  The control
//! loop only ever sees [`poll`](BrokerPort::poll), which never blocks.
//!
//! ```text
//!   esp-mqtt task ──▶ EspMqttConnection ──▶ mqtt-rx ──mpsc──▶ poll()
//!                                              │
//!                                              └──▶ connected: AtomicBool
//! ```
//!
//! Reopening drops the previous client, which ends its receiver thread.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real client.
//! - **all other targets**: in-memory session for the host simulation, with
//!   [`MqttAdapter::inject`] to feed inbound messages.

use log::{info, warn};

use crate::app::ports::{BrokerEndpoint, BrokerPort, InboundMessage, SessionIdentity};
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, Sender, TryRecvError},
};
#[cfg(target_os = "espidf")]
use std::{thread, time::Duration};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

/// How long `open` waits for the broker's CONNACK.
#[cfg(target_os = "espidf")]
const CONNECT_TIMEOUT_MS: u32 = 10_000;
#[cfg(target_os = "espidf")]
const CONNECT_POLL_MS: u32 = 50;
#[cfg(target_os = "espidf")]
const RX_STACK_BYTES: usize = 6 * 1024;

// ───────────────────────────────────────────────────────────────
// ESP-IDF session
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
struct Session {
    client: EspMqttClient<'static>,
    inbox: Receiver<InboundMessage>,
    connected: Arc<AtomicBool>,
}

#[cfg(target_os = "espidf")]
fn spawn_receiver(
    mut conn: EspMqttConnection,
    tx: Sender<InboundMessage>,
    connected: Arc<AtomicBool>,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name("mqtt-rx".into())
        .stack_size(RX_STACK_BYTES)
        .spawn(move || {
            loop {
                match conn.next() {
                    Ok(event) => match event.payload() {
                        EventPayload::Connected(_) => {
                            connected.store(true, Ordering::Release);
                        }
                        EventPayload::Disconnected => {
                            connected.store(false, Ordering::Release);
                            warn!("MQTT: broker disconnected");
                        }
                        EventPayload::Received {
                            topic: Some(topic),
                            data,
                            details,
                            ..
                        } => {
                            // Only complete payloads are routed.
                            if !matches!(details, Details::Complete) {
                                continue;
                            }
                            if tx.send(InboundMessage::new(topic, data)).is_err() {
                                break;
                            }
                        }
                        _ => {}
                    },
                    Err(e) => {
                        connected.store(false, Ordering::Release);
                        warn!("MQTT: receive loop ended: {e:?}");
                        break;
                    }
                }
            }
            info!("MQTT: receiver exiting");
        })
        .map(|_| ())
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct MqttAdapter {
    #[cfg(target_os = "espidf")]
    session: Option<Session>,

    #[cfg(not(target_os = "espidf"))]
    sim_endpoint: Option<BrokerEndpoint>,
    #[cfg(not(target_os = "espidf"))]
    sim_inbox: VecDeque<InboundMessage>,
    #[cfg(not(target_os = "espidf"))]
    sim_subscriptions: Vec<String>,
    #[cfg(not(target_os = "espidf"))]
    sim_published: Vec<(String, Vec<u8>)>,
    #[cfg(not(target_os = "espidf"))]
    sim_drop_pending: bool,
}

impl Default for MqttAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "espidf")]
            session: None,
            #[cfg(not(target_os = "espidf"))]
            sim_endpoint: None,
            #[cfg(not(target_os = "espidf"))]
            sim_inbox: VecDeque::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_subscriptions: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_published: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_drop_pending: false,
        }
    }

    /// Whether a session has been opened and not lost.
    #[cfg(target_os = "espidf")]
    pub fn is_open(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.connected.load(Ordering::Acquire))
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn is_open(&self) -> bool {
        self.sim_endpoint.is_some()
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_open(
        &mut self,
        endpoint: BrokerEndpoint,
        identity: &SessionIdentity,
    ) -> Result<(), CommsError> {
        let url = format!("mqtt://{}:{}", endpoint.host, endpoint.port);
        let conf = MqttClientConfiguration {
            client_id: Some(identity.client_id.as_str()),
            username: (!identity.user.is_empty()).then_some(identity.user.as_str()),
            password: (!identity.password.is_empty()).then_some(identity.password.as_str()),
            ..Default::default()
        };

        let (client, conn) = EspMqttClient::new(url.as_str(), &conf).map_err(|e| {
            warn!("MQTT: client create failed for {url}: {e}");
            CommsError::ConnectFailed
        })?;

        let (tx, inbox) = mpsc::channel();
        let connected = Arc::new(AtomicBool::new(false));
        spawn_receiver(conn, tx, Arc::clone(&connected)).map_err(|e| {
            warn!("MQTT: receiver spawn failed: {e}");
            CommsError::ConnectFailed
        })?;

        let mut waited = 0;
        while !connected.load(Ordering::Acquire) {
            if waited >= CONNECT_TIMEOUT_MS {
                warn!("MQTT: no CONNACK from {url} after {waited}ms");
                return Err(CommsError::ConnectFailed);
            }
            thread::sleep(Duration::from_millis(u64::from(CONNECT_POLL_MS)));
            waited += CONNECT_POLL_MS;
        }

        info!("MQTT: connected to {url} as '{}'", identity.client_id);
        self.session = Some(Session {
            client,
            inbox,
            connected,
        });
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_open(
        &mut self,
        endpoint: BrokerEndpoint,
        identity: &SessionIdentity,
    ) -> Result<(), CommsError> {
        self.sim_endpoint = Some(endpoint);
        self.sim_subscriptions.clear();
        self.sim_drop_pending = false;
        info!(
            "MQTT(sim): session open to {}:{} as '{}'",
            endpoint.host, endpoint.port, identity.client_id
        );
        Ok(())
    }

    // ── Simulation hooks ──────────────────────────────────────

    /// Queue a message as if the broker had delivered it.
    #[cfg(not(target_os = "espidf"))]
    pub fn inject(&mut self, topic: &str, payload: &[u8]) {
        self.sim_inbox.push_back(InboundMessage::new(topic, payload));
    }

    /// Make the next `poll` report a lost session.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_session(&mut self) {
        self.sim_drop_pending = true;
    }

    /// Everything published so far, oldest first.
    #[cfg(not(target_os = "espidf"))]
    pub fn published(&self) -> &[(String, Vec<u8>)] {
        &self.sim_published
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn subscriptions(&self) -> &[String] {
        &self.sim_subscriptions
    }
}

// ───────────────────────────────────────────────────────────────
// BrokerPort
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl BrokerPort for MqttAdapter {
    fn open(&mut self, endpoint: BrokerEndpoint, identity: &SessionIdentity) -> Result<(), CommsError> {
        // Dropping the old client ends its receiver thread.
        self.session = None;
        self.platform_open(endpoint, identity)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        let session = self.session.as_mut().ok_or(CommsError::NotConnected)?;
        session
            .client
            .subscribe(topic, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: subscribe {topic} failed: {e}");
                CommsError::SubscribeFailed
            })
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        let session = self.session.as_mut().ok_or(CommsError::NotConnected)?;
        if !session.connected.load(Ordering::Acquire) {
            return Err(CommsError::ConnectionLost);
        }
        session
            .client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: publish {topic} failed: {e}");
                CommsError::PublishFailed
            })
    }

    fn poll(&mut self) -> Result<Option<InboundMessage>, CommsError> {
        let session = self.session.as_mut().ok_or(CommsError::NotConnected)?;
        match session.inbox.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty) if session.connected.load(Ordering::Acquire) => Ok(None),
            Err(_) => Err(CommsError::ConnectionLost),
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl BrokerPort for MqttAdapter {
    fn open(&mut self, endpoint: BrokerEndpoint, identity: &SessionIdentity) -> Result<(), CommsError> {
        self.sim_endpoint = None;
        self.platform_open(endpoint, identity)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        if self.sim_endpoint.is_none() {
            return Err(CommsError::NotConnected);
        }
        self.sim_subscriptions.push(topic.to_owned());
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        if self.sim_endpoint.is_none() {
            return Err(CommsError::NotConnected);
        }
        info!("MQTT(sim): {} <- {}", topic, String::from_utf8_lossy(payload));
        self.sim_published.push((topic.to_owned(), payload.to_vec()));
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<InboundMessage>, CommsError> {
        if self.sim_endpoint.is_none() {
            return Err(CommsError::NotConnected);
        }
        if self.sim_drop_pending {
            self.sim_drop_pending = false;
            self.sim_endpoint = None;
            warn!("MQTT(sim): session dropped");
            return Err(CommsError::ConnectionLost);
        }
        Ok(self.sim_inbox.pop_front())
    }
}
