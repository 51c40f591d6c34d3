//! Controller loop: inbound routing, notifications, probes, trigger inputs
//! and reconnects, end to end against mock adapters.

use crate::mock_hw::{MockBoard, MockBroker, MockLink, RecordingSink};

use pwrshield::app::events::AppEvent;
use pwrshield::app::ports::SessionIdentity;
use pwrshield::app::service::{Controller, CycleOutcome};
use pwrshield::config::ShieldConfig;
use pwrshield::error::{CommsError, DecodeError};
use pwrshield::fsm::PowerState;
use pwrshield::pins::{InputId, Level, OutputId};
use pwrshield::supervisor::ConnectivitySupervisor;
use pwrshield::topics::TopicTable;

const DEVICE: &str = "0a0b0c0d0e0f";
const CMD: &str = "pwr/all/cup";
const DEVICE_CMD: &str = "pwr/0a0b0c0d0e0f/cup";
const PING: &str = "pwr/all/ping";
const HANDSHAKE: &str = "ask/pwr/all/cup";
const NOTIFY: &str = "ask/pwr/all/sup";
const PONG: &str = "ask/pwr/0a0b0c0d0e0f/pong";

const AUX: &[u8] = br#"{"datahold":{"powerstate":"AUX"}}"#;
const PWR: &[u8] = br#"{"datahold":{"powerstate":"PWR"}}"#;
const OFF: &[u8] = br#"{"datahold":{"powerstate":"OFF"}}"#;

type Supervisor = ConnectivitySupervisor<MockLink, MockBroker>;

struct Rig {
    controller: Controller,
    sup: Supervisor,
    hw: MockBoard,
    sink: RecordingSink,
}

impl Rig {
    fn with_config(config: &ShieldConfig) -> Self {
        let topics = TopicTable::resolve(&config.topics, DEVICE);
        let identity = SessionIdentity {
            client_id: DEVICE.into(),
            user: config.broker_user.clone(),
            password: config.broker_password.clone(),
        };
        let mut sup = ConnectivitySupervisor::new(MockLink::new(), MockBroker::new(), identity, config);
        let mut hw = MockBoard::new();
        let mut sink = RecordingSink::new();
        let mut controller = Controller::new(config, topics);
        controller.start(&mut hw, &mut sink);
        controller
            .connect(&mut sup, &mut hw, &mut sink)
            .expect("mock link comes up");
        Self {
            controller,
            sup,
            hw,
            sink,
        }
    }

    fn new() -> Self {
        Self::with_config(&ShieldConfig::default())
    }

    fn broker(&mut self) -> &mut MockBroker {
        self.sup.session()
    }

    fn cycle(&mut self) -> CycleOutcome {
        self.controller
            .run_cycle(&mut self.sup, &mut self.hw, &mut self.sink)
            .expect("unbounded policy never gives up")
    }
}

fn notify_body(ts: i64, state: &str) -> Vec<u8> {
    format!(r#"{{"timestamp":{ts},"datahold":{{"powerstate":"{state}"}}}}"#).into_bytes()
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_deasserts_outputs_and_greets_broker() {
    let rig = Rig::new();

    assert_eq!(rig.hw.levels(), [Level::Low; OutputId::COUNT]);
    assert_eq!(rig.hw.writes.len(), OutputId::COUNT);
    assert_eq!(rig.controller.state(), PowerState::Off);
    assert!(rig.controller.status().link_connected);

    let broker = rig.sup.broker();
    assert_eq!(broker.subscriptions, vec![CMD, DEVICE_CMD, PING]);
    assert_eq!(broker.published_on(HANDSHAKE), vec![br#"{"timestamp":1}"#.to_vec()]);
    assert_eq!(broker.client_ids, vec![DEVICE.to_owned()]);
    assert!(matches!(rig.sink.events[0], AppEvent::Started(PowerState::Off)));
}

#[test]
fn idle_cycle_does_nothing() {
    let mut rig = Rig::new();
    let published = rig.sup.broker().published.len();
    assert_eq!(rig.cycle(), CycleOutcome::Idle);
    assert_eq!(rig.sup.broker().published.len(), published);
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn aux_command_runs_sequence_and_notifies_with_uptime() {
    let mut rig = Rig::new();
    rig.broker().inject(CMD, AUX);

    assert_eq!(rig.cycle(), CycleOutcome::Dispatched);
    assert_eq!(rig.controller.state(), PowerState::Aux);
    assert!(!rig.controller.status().pending_notification);
    // Never pinged: the timestamp counts seconds since boot.
    assert_eq!(rig.sup.broker().published_on(NOTIFY), vec![notify_body(16, "AUX")]);
    assert!(rig.sink.events.contains(&AppEvent::StateChanged {
        from: PowerState::Off,
        to: PowerState::Aux
    }));
}

#[test]
fn device_addressed_command_is_honoured() {
    let mut rig = Rig::new();
    rig.broker().inject(DEVICE_CMD, AUX);
    rig.cycle();
    assert_eq!(rig.controller.state(), PowerState::Aux);
}

#[test]
fn full_power_up_and_down() {
    let mut rig = Rig::new();
    for (body, state) in [(AUX, PowerState::Aux), (PWR, PowerState::Pwr), (OFF, PowerState::Off)] {
        rig.broker().inject(CMD, body);
        assert_eq!(rig.cycle(), CycleOutcome::Dispatched);
        assert_eq!(rig.controller.state(), state);
    }
    assert_eq!(rig.sup.broker().published_on(NOTIFY).len(), 3);
    assert_eq!(rig.hw.levels(), [Level::Low; OutputId::COUNT]);
}

#[test]
fn queued_commands_each_get_their_notification() {
    let mut rig = Rig::new();
    rig.broker().inject(CMD, AUX);
    rig.broker().inject(CMD, PWR);

    assert_eq!(rig.cycle(), CycleOutcome::Dispatched);
    assert_eq!(rig.controller.state(), PowerState::Aux);
    assert_eq!(rig.sup.broker().inbox.len(), 1);

    assert_eq!(rig.cycle(), CycleOutcome::Dispatched);
    assert_eq!(rig.controller.state(), PowerState::Pwr);
    assert_eq!(
        rig.sup.broker().published_on(NOTIFY),
        vec![notify_body(16, "AUX"), notify_body(16, "PWR")]
    );
}

#[test]
fn repeated_command_sends_one_notification() {
    let mut rig = Rig::new();
    rig.broker().inject(CMD, AUX);
    rig.cycle();
    let writes = rig.hw.writes.len();

    rig.broker().inject(CMD, AUX);
    assert_eq!(rig.cycle(), CycleOutcome::Idle);
    assert_eq!(rig.hw.writes.len(), writes);
    assert_eq!(rig.sup.broker().published_on(NOTIFY).len(), 1);
}

#[test]
fn illegal_command_is_rejected_without_side_effects() {
    let mut rig = Rig::new();
    rig.broker().inject(CMD, PWR);
    let writes = rig.hw.writes.len();

    assert_eq!(rig.cycle(), CycleOutcome::Idle);
    assert_eq!(rig.controller.state(), PowerState::Off);
    assert_eq!(rig.hw.writes.len(), writes);
    assert!(rig.sup.broker().published_on(NOTIFY).is_empty());
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::TransitionRejected { .. })),
        1
    );
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::StateChanged { .. })), 0);
    assert!(rig.sink.events.contains(&AppEvent::TransitionRejected {
        from: PowerState::Off,
        to: PowerState::Pwr
    }));
}

#[test]
fn reset_requests_restart_without_touching_state() {
    let mut rig = Rig::new();
    rig.broker().inject(CMD, AUX);
    rig.cycle();
    let writes = rig.hw.writes.len();

    rig.broker().inject(CMD, br#"{"datahold":{"powerstate":"RESET"}}"#);
    assert_eq!(rig.cycle(), CycleOutcome::RestartRequested);
    assert_eq!(rig.controller.state(), PowerState::Aux);
    assert_eq!(rig.hw.writes.len(), writes);
    assert!(rig.sink.events.contains(&AppEvent::RestartRequested));
}

#[test]
fn malformed_command_is_discarded_after_a_pause() {
    let mut rig = Rig::new();
    rig.broker().inject(CMD, b"{\"datahold\":");
    let t0 = rig.hw.now_ms;

    assert_eq!(rig.cycle(), CycleOutcome::Idle);
    assert_eq!(rig.hw.now_ms - t0, 200);
    assert_eq!(rig.controller.state(), PowerState::Off);
    assert!(rig.sink.events.contains(&AppEvent::CommandDiscarded(DecodeError::Syntax)));
}

#[test]
fn oversized_command_is_discarded() {
    let mut rig = Rig::new();
    let mut big = AUX.to_vec();
    big.resize(600, b' ');
    rig.broker().inject(CMD, &big);

    rig.cycle();
    assert_eq!(rig.controller.state(), PowerState::Off);
    assert!(rig.sink.events.contains(&AppEvent::CommandDiscarded(DecodeError::Oversized)));
}

#[test]
fn unknown_topics_are_ignored() {
    let mut rig = Rig::new();
    rig.broker().inject("pwr/ffffffffffff/cup", AUX);
    assert_eq!(rig.cycle(), CycleOutcome::Idle);
    assert_eq!(rig.controller.state(), PowerState::Off);
}

#[test]
fn inbound_drain_is_bounded_per_cycle() {
    let config = ShieldConfig {
        max_inbound_per_cycle: 3,
        ..ShieldConfig::default()
    };
    let mut rig = Rig::with_config(&config);
    for _ in 0..5 {
        rig.broker().inject("noise/topic", b"x");
    }
    rig.cycle();
    assert_eq!(rig.sup.broker().inbox.len(), 2);
}

// ── Probes ────────────────────────────────────────────────────

#[test]
fn ping_is_echoed_verbatim_and_anchors_clock() {
    let mut rig = Rig::new();
    rig.hw.advance(7_000);
    let probe = br#"{"timestamp":1700000000,"from":"ops"}"#;
    rig.broker().inject(PING, probe);

    assert_eq!(rig.cycle(), CycleOutcome::Answered);
    assert_eq!(rig.sup.broker().published_on(PONG), vec![probe.to_vec()]);
    assert_eq!(rig.controller.status().last_ping_timestamp(), 1_700_000_000);
    assert_eq!(rig.controller.status().last_ping_received_at(), 7_000);
    assert!(rig.controller.pending_probe().is_none());
    assert!(rig.sink.events.contains(&AppEvent::PongSent {
        timestamp: Some(1_700_000_000)
    }));
}

#[test]
fn large_ping_is_echoed_without_pause() {
    let mut rig = Rig::new();
    let mut ping = br#"{"timestamp":1700000000,"pad":""#.to_vec();
    ping.resize(630, b'x');
    ping.extend_from_slice(br#""}"#);
    rig.broker().inject(PING, &ping);
    let t0 = rig.hw.now_ms;

    assert_eq!(rig.cycle(), CycleOutcome::Answered);
    assert_eq!(rig.hw.now_ms, t0);
    assert_eq!(rig.sup.broker().published_on(PONG), vec![ping]);
    assert_eq!(rig.controller.status().last_ping_timestamp(), 1_700_000_000);
}

#[test]
fn ping_without_timestamp_is_echoed_but_clock_untouched() {
    let mut rig = Rig::new();
    rig.broker().inject(PING, b"hello");

    assert_eq!(rig.cycle(), CycleOutcome::Answered);
    assert_eq!(rig.sup.broker().published_on(PONG), vec![b"hello".to_vec()]);
    assert_eq!(rig.controller.status().last_ping_timestamp(), 0);
}

#[test]
fn newer_probe_replaces_unanswered_one() {
    let mut rig = Rig::new();
    rig.broker().inject(PING, br#"{"timestamp":1}"#);
    rig.broker().inject(PING, br#"{"timestamp":2}"#);

    rig.cycle();
    assert_eq!(
        rig.sup.broker().published_on(PONG),
        vec![br#"{"timestamp":2}"#.to_vec()]
    );
}

#[test]
fn notification_timestamp_is_borrowed_from_last_ping() {
    let mut rig = Rig::new();
    rig.broker().inject(PING, br#"{"timestamp":1700000000}"#);
    rig.cycle();

    rig.hw.advance(5_000);
    rig.broker().inject(CMD, AUX);
    rig.cycle();

    // 5 s idle + 16 s sequence
    assert_eq!(
        rig.sup.broker().published_on(NOTIFY),
        vec![notify_body(1_700_000_021, "AUX")]
    );
}

#[test]
fn pending_probe_skips_trigger_polling() {
    let mut rig = Rig::new();
    rig.hw.press(InputId::Trigger, true);
    rig.broker().inject(PING, b"{}");

    assert_eq!(rig.cycle(), CycleOutcome::Answered);
    assert_eq!(rig.controller.state(), PowerState::Off);

    assert_eq!(rig.cycle(), CycleOutcome::Dispatched);
    assert_eq!(rig.controller.state(), PowerState::Aux);
}

// ── Trigger inputs ────────────────────────────────────────────

#[test]
fn triggers_walk_off_aux_pwr() {
    let mut rig = Rig::new();

    rig.hw.press(InputId::SecondaryTrigger, true);
    assert_eq!(rig.cycle(), CycleOutcome::Idle);
    assert_eq!(rig.controller.state(), PowerState::Off);

    rig.hw.press(InputId::Trigger, true);
    assert_eq!(rig.cycle(), CycleOutcome::Dispatched);
    assert_eq!(rig.controller.state(), PowerState::Aux);

    // Trigger still held: AUX ignores it, the secondary trigger wins.
    assert_eq!(rig.cycle(), CycleOutcome::Dispatched);
    assert_eq!(rig.controller.state(), PowerState::Pwr);

    assert_eq!(rig.cycle(), CycleOutcome::Idle);
    assert_eq!(rig.sup.broker().published_on(NOTIFY).len(), 2);
}

// ── Link loss ─────────────────────────────────────────────────

#[test]
fn transport_error_reconnects_and_greets_again() {
    let mut rig = Rig::new();
    rig.broker().poll_error = Some(CommsError::ConnectionLost);

    assert_eq!(rig.cycle(), CycleOutcome::Reconnected);
    assert!(rig.controller.status().link_connected);
    let broker = rig.sup.broker();
    assert_eq!(broker.open_calls(), 2);
    assert_eq!(broker.published_on(HANDSHAKE).len(), 2);
    assert_eq!(broker.subscriptions.len(), 6);
    assert!(rig.sink.events.contains(&AppEvent::LinkLost(CommsError::ConnectionLost)));
}

#[test]
fn reconnect_keeps_power_state() {
    let mut rig = Rig::new();
    rig.broker().inject(CMD, AUX);
    rig.cycle();
    let writes = rig.hw.writes.len();

    rig.broker().poll_error = Some(CommsError::ConnectionLost);
    rig.cycle();
    assert_eq!(rig.controller.state(), PowerState::Aux);
    assert_eq!(rig.hw.writes.len(), writes);
}

#[test]
fn failed_notification_survives_reconnect() {
    let mut rig = Rig::new();
    rig.broker().inject(CMD, AUX);
    rig.broker().publish_failures_left = 1;

    assert_eq!(rig.cycle(), CycleOutcome::Dispatched);
    assert!(rig.controller.status().pending_notification);
    assert!(rig.sup.broker().published_on(NOTIFY).is_empty());
    assert_eq!(rig.sup.broker().open_calls(), 2);

    rig.cycle();
    assert!(!rig.controller.status().pending_notification);
    assert_eq!(rig.sup.broker().published_on(NOTIFY).len(), 1);
}

#[test]
fn failed_pong_keeps_probe_for_next_cycle() {
    let mut rig = Rig::new();
    rig.broker().inject(PING, br#"{"timestamp":9}"#);
    rig.broker().publish_failures_left = 1;

    assert_eq!(rig.cycle(), CycleOutcome::Reconnected);
    assert!(rig.controller.pending_probe().is_some());
    assert_eq!(rig.controller.status().last_ping_timestamp(), 0);

    assert_eq!(rig.cycle(), CycleOutcome::Answered);
    assert_eq!(rig.sup.broker().published_on(PONG).len(), 1);
    assert_eq!(rig.controller.status().last_ping_timestamp(), 9);
}
