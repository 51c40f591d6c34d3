//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each application event as one tagged
//! line to the ESP-IDF logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from, to);
            }
            AppEvent::TransitionRejected { from, to } => {
                warn!("STATE | rejected {} -> {}", from, to);
            }
            AppEvent::LinkUp { broker, attempts } => {
                info!("LINK  | up, broker={} attempts={}", broker, attempts);
            }
            AppEvent::LinkLost(e) => {
                warn!("LINK  | down: {}", e);
            }
            AppEvent::NotificationSent { state, timestamp } => {
                info!("NOTIFY| state={} ts={}", state, timestamp);
            }
            AppEvent::PongSent { timestamp } => match timestamp {
                Some(ts) => info!("PONG  | ts={}", ts),
                None => info!("PONG  | no timestamp"),
            },
            AppEvent::CommandDiscarded(e) => {
                warn!("CMD   | discarded: {}", e);
            }
            AppEvent::RestartRequested => {
                warn!("RESET | restart requested");
            }
        }
    }
}
