//! PwrShield Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GpioBoard            WifiAdapter   MqttAdapter   LogEventSink │
//! │  (Output/Input/Delay/ (LinkPort)    (BrokerPort)  (EventSink)  │
//! │   Clock ports)                                                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  Controller  ·  PowerStateMachine  ·  Supervisor       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On ESP-IDF a restart request ends in `esp_restart`.  On the host the
//! whole runtime is rebuilt and re-entered, which is the closest analogue.
#![deny(unused_must_use)]

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use pwrshield::adapters::device_id;
use pwrshield::adapters::log_sink::LogEventSink;
use pwrshield::adapters::mqtt::MqttAdapter;
use pwrshield::adapters::wifi::WifiAdapter;
use pwrshield::app::ports::{Board, SessionIdentity};
use pwrshield::app::service::{Controller, CycleOutcome};
use pwrshield::config::ShieldConfig;
use pwrshield::supervisor::ConnectivitySupervisor;
use pwrshield::topics::TopicTable;

#[cfg(target_os = "espidf")]
use esp_idf_hal::{
    delay::FreeRtos,
    gpio::{IOPin, OutputPin, PinDriver, Pull},
    peripherals::Peripherals,
};
#[cfg(target_os = "espidf")]
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};
#[cfg(target_os = "espidf")]
use pwrshield::adapters::hardware::GpioBoard;

// ── Shared bring-up ───────────────────────────────────────────

fn load_config() -> Result<ShieldConfig> {
    let config = ShieldConfig::from_build_env();
    config.validate().context("invalid build configuration")?;
    Ok(config)
}

/// Connect, then cycle until someone asks for a restart.
fn run_until_restart(
    config: &ShieldConfig,
    topics: TopicTable,
    supervisor: &mut ConnectivitySupervisor<WifiAdapter, MqttAdapter>,
    board: &mut impl Board,
) -> Result<()> {
    let mut sink = LogEventSink::new();
    let mut controller = Controller::new(config, topics);

    controller.start(board, &mut sink);
    controller
        .connect(supervisor, board, &mut sink)
        .context("initial link bring-up")?;

    info!("System ready. Entering control loop.");
    loop {
        let outcome = controller
            .run_cycle(supervisor, board, &mut sink)
            .context("control cycle")?;
        if outcome == CycleOutcome::RestartRequested {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(u64::from(config.cycle_pause_ms)));
    }
}

fn banner(id: &str) {
    info!("╔══════════════════════════════════════╗");
    info!("║  PwrShield v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
    info!("Device id: {}", id);
}

// ── ESP-IDF ───────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let config = load_config()?;
    let id = device_id::device_id(&device_id::read_mac());
    banner(&id);
    let topics = TopicTable::resolve(&config.topics, &id);

    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let pins = peripherals.pins;

    // OutputId::ALL order: Relay, Secondary, Cooling
    let outputs = [
        PinDriver::output(pins.gpio14.downgrade_output())?,
        PinDriver::output(pins.gpio12.downgrade_output())?,
        PinDriver::output(pins.gpio13.downgrade_output())?,
    ];
    // InputId::ALL order: Trigger, SecondaryTrigger
    let trigger = PinDriver::input(pins.gpio16.downgrade())?;
    let mut secondary = PinDriver::input(pins.gpio4.downgrade())?;
    secondary.set_pull(Pull::Up)?;
    let mut board = GpioBoard::new(outputs, [trigger, secondary], FreeRtos);

    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take().ok();
    let mut wifi = WifiAdapter::new(peripherals.modem, sysloop, nvs)?;
    wifi.set_credentials(&config.wifi_ssid, &config.wifi_password)?;

    let identity = SessionIdentity {
        client_id: id.as_str().to_owned(),
        user: config.broker_user.clone(),
        password: config.broker_password.clone(),
    };
    let mut supervisor = ConnectivitySupervisor::new(wifi, MqttAdapter::new(), identity, &config);

    run_until_restart(&config, topics, &mut supervisor, &mut board)?;

    info!("Restarting");
    esp_idf_hal::reset::restart();
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use pwrshield::adapters::hardware::{GpioBoard, SimPin};
    use pwrshield::adapters::time::StdDelay;
    use pwrshield::pins::{InputId, OutputId};

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = load_config()?;
    let id = device_id::device_id(&device_id::read_mac());
    banner(&id);

    loop {
        let topics = TopicTable::resolve(&config.topics, &id);
        let mut board = GpioBoard::new(
            [SimPin::default(); OutputId::COUNT],
            [SimPin::default(); InputId::COUNT],
            StdDelay,
        );

        let mut wifi = WifiAdapter::new();
        wifi.set_credentials(&config.wifi_ssid, &config.wifi_password)?;
        let identity = SessionIdentity {
            client_id: id.as_str().to_owned(),
            user: config.broker_user.clone(),
            password: config.broker_password.clone(),
        };
        let mut supervisor =
            ConnectivitySupervisor::new(wifi, MqttAdapter::new(), identity, &config);

        run_until_restart(&config, topics, &mut supervisor, &mut board)?;
        info!("Restart requested; rebuilding runtime");
    }
}
