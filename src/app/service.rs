//! Controller: the hexagonal core.
//!
//! [`Controller`] owns the power state machine, the live
//! [`ControllerStatus`] and the resolved topic table.  It exposes one
//! cooperative step, [`Controller::run_cycle`]; all I/O flows through port
//! traits and the [`ConnectivitySupervisor`] injected at call sites.
//!
//! ```text
//!   BrokerPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                  │        Controller         │
//!   InputPort  ──▶ │ router · FSM · heartbeat  │ ──▶ OutputPort
//!                  └──────────────────────────┘
//! ```
//!
//! Cycle order:
//!
//! 1. drain up to `max_inbound_per_cycle` inbound messages, stopping as
//!    soon as a notification is owed; a transport error hands control to
//!    the supervisor until the link is back;
//! 2. publish the state notification if one is owed;
//! 3. answer a pending probe and end the cycle;
//! 4. otherwise poll the trigger inputs.

use std::net::Ipv4Addr;

use log::{debug, info, warn};

use crate::codec;
use crate::config::ShieldConfig;
use crate::error::CommsError;
use crate::fsm::status::ControllerStatus;
use crate::fsm::{PowerState, PowerStateMachine};
use crate::heartbeat::PingProbe;
use crate::pins::InputId;
use crate::router::{self, Inbound};
use crate::supervisor::ConnectivitySupervisor;
use crate::topics::{TopicRole, TopicTable};

use super::commands::Command;
use super::events::AppEvent;
use super::ports::{
    Board, BrokerPort, ClockPort, DelayPort, EventSink, InputPort, LinkPort, OutputPort,
};

/// What a single [`Controller::run_cycle`] did, most significant first
/// when several things happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CycleOutcome {
    /// Nothing to do.
    Idle,
    /// The link dropped and was re-established.
    Reconnected,
    /// A command or trigger ran a transition.
    Dispatched,
    /// A probe was answered; inputs were not polled.
    Answered,
    /// An operator asked for a restart.  The caller must restart.
    RestartRequested,
}

/// The control loop.
pub struct Controller {
    fsm: PowerStateMachine,
    status: ControllerStatus,
    topics: TopicTable,
    pending_probe: Option<PingProbe>,
    decode_error_pause_ms: u32,
    max_inbound_per_cycle: u8,
    max_payload_bytes: usize,
}

impl Controller {
    /// Build the controller.  Outputs are untouched until [`start`](Self::start).
    pub fn new(config: &ShieldConfig, topics: TopicTable) -> Self {
        Self {
            fsm: PowerStateMachine::new(),
            status: ControllerStatus::new(),
            topics,
            pending_probe: None,
            decode_error_pause_ms: config.decode_error_pause_ms,
            max_inbound_per_cycle: config.max_inbound_per_cycle,
            max_payload_bytes: config.max_payload_bytes,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// De-assert every output to match the boot state.
    pub fn start(&mut self, hw: &mut impl OutputPort, sink: &mut impl EventSink) {
        let state = self.status.state();
        self.fsm.apply_outputs(state, hw);
        sink.emit(&AppEvent::Started(state));
        info!("Controller started in {}", state);
    }

    /// Blocking link bring-up.  Call once after [`start`](Self::start).
    pub fn connect<L: LinkPort, M: BrokerPort>(
        &mut self,
        supervisor: &mut ConnectivitySupervisor<L, M>,
        hw: &mut (impl OutputPort + DelayPort),
        sink: &mut impl EventSink,
    ) -> Result<Ipv4Addr, CommsError> {
        supervisor.ensure_link(&mut self.status, &self.topics, hw, sink)
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one cooperative cycle.
    ///
    /// Fails only when a bounded [`RetryPolicy`](crate::supervisor::RetryPolicy)
    /// gives up on the link, or a notification cannot be encoded.
    pub fn run_cycle<L: LinkPort, M: BrokerPort>(
        &mut self,
        supervisor: &mut ConnectivitySupervisor<L, M>,
        hw: &mut impl Board,
        sink: &mut impl EventSink,
    ) -> Result<CycleOutcome, CommsError> {
        let mut outcome = CycleOutcome::Idle;

        // 1. Inbound
        for _ in 0..self.max_inbound_per_cycle {
            // One transition per notification: publish before taking the next command.
            if self.status.pending_notification {
                break;
            }
            let msg = match supervisor.session().poll() {
                Ok(Some(msg)) => msg,
                Ok(None) => break,
                Err(e) => {
                    self.recover(supervisor, hw, sink, e)?;
                    outcome = outcome.max(CycleOutcome::Reconnected);
                    break;
                }
            };
            match router::route_inbound(&self.topics, &msg.topic, &msg.payload, self.max_payload_bytes) {
                Inbound::Command(cmd) => {
                    let result = self.handle_command(cmd, hw, sink);
                    if result == CycleOutcome::RestartRequested {
                        return Ok(result);
                    }
                    outcome = outcome.max(result);
                }
                Inbound::Ping(probe) => {
                    if self.pending_probe.replace(probe).is_some() {
                        debug!("Controller: unanswered probe replaced");
                    }
                }
                Inbound::Discarded(e) => {
                    warn!("Controller: discarded payload on {}: {}", msg.topic, e);
                    sink.emit(&AppEvent::CommandDiscarded(e));
                    hw.delay_ms(self.decode_error_pause_ms);
                }
                Inbound::Ignored => debug!("Controller: ignored message on {}", msg.topic),
            }
        }

        // 2. State notification
        if self.status.pending_notification {
            let state = self.status.state();
            let timestamp = self.status.reconstructed_timestamp(hw.now_ms());
            let body = codec::encode_state_notify(timestamp, state)?;
            match supervisor
                .session()
                .publish(self.topics.get(TopicRole::StateNotify), &body)
            {
                Ok(()) => {
                    self.status.pending_notification = false;
                    info!("Controller: notified {} @ {}", state, timestamp);
                    sink.emit(&AppEvent::NotificationSent { state, timestamp });
                }
                Err(e) => {
                    self.recover(supervisor, hw, sink, e)?;
                    outcome = outcome.max(CycleOutcome::Reconnected);
                }
            }
        }

        // 3. Pending probe
        if let Some(probe) = self.pending_probe.take() {
            match supervisor
                .session()
                .publish(self.topics.get(TopicRole::Pong), probe.payload())
            {
                Ok(()) => {
                    if let Some(ts) = probe.timestamp() {
                        self.status.record_ping(ts, hw.now_ms());
                    }
                    sink.emit(&AppEvent::PongSent {
                        timestamp: probe.timestamp(),
                    });
                    return Ok(outcome.max(CycleOutcome::Answered));
                }
                Err(e) => {
                    self.pending_probe = Some(probe);
                    self.recover(supervisor, hw, sink, e)?;
                    return Ok(outcome.max(CycleOutcome::Reconnected));
                }
            }
        }

        // 4. Trigger inputs
        let from_pins = match self.status.state() {
            PowerState::Off if hw.is_asserted(InputId::Trigger) => Some(PowerState::Aux),
            PowerState::Aux if hw.is_asserted(InputId::SecondaryTrigger) => Some(PowerState::Pwr),
            _ => None,
        };
        if let Some(target) = from_pins {
            info!("Controller: trigger input requests {}", target);
            let result = self.handle_command(Command::SetPowerState(target), hw, sink);
            outcome = outcome.max(result);
        }

        Ok(outcome)
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply a decoded command.  Transitions block for the full sequence.
    pub fn handle_command(
        &mut self,
        cmd: Command,
        hw: &mut (impl OutputPort + DelayPort),
        sink: &mut impl EventSink,
    ) -> CycleOutcome {
        match cmd {
            Command::Reset => {
                warn!("Controller: restart requested");
                sink.emit(&AppEvent::RestartRequested);
                CycleOutcome::RestartRequested
            }
            Command::SetPowerState(target) => {
                let from = self.status.state();
                if from == target {
                    debug!("Controller: already {}", target);
                    return CycleOutcome::Idle;
                }
                if !self.fsm.permits(from, target) {
                    sink.emit(&AppEvent::TransitionRejected { from, to: target });
                    return CycleOutcome::Idle;
                }
                if self.fsm.request_transition(target, &mut self.status, hw) {
                    sink.emit(&AppEvent::StateChanged { from, to: target });
                    CycleOutcome::Dispatched
                } else {
                    CycleOutcome::Idle
                }
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> PowerState {
        self.status.state()
    }

    pub fn status(&self) -> &ControllerStatus {
        &self.status
    }

    pub fn topics(&self) -> &TopicTable {
        &self.topics
    }

    /// Probe waiting for its reply, if any.
    pub fn pending_probe(&self) -> Option<&PingProbe> {
        self.pending_probe.as_ref()
    }

    // ── Internal ──────────────────────────────────────────────

    fn recover<L: LinkPort, M: BrokerPort>(
        &mut self,
        supervisor: &mut ConnectivitySupervisor<L, M>,
        hw: &mut (impl OutputPort + DelayPort),
        sink: &mut impl EventSink,
        cause: CommsError,
    ) -> Result<(), CommsError> {
        warn!("Controller: link lost: {}", cause);
        self.status.link_connected = false;
        sink.emit(&AppEvent::LinkLost(cause));
        supervisor
            .ensure_link(&mut self.status, &self.topics, hw, sink)
            .map(|_| ())
    }
}
