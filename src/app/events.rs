//! Outbound application events.
//!
//! The [`Controller`](super::service::Controller) and the
//! [`ConnectivitySupervisor`](crate::supervisor::ConnectivitySupervisor)
//! emit these through the [`EventSink`](super::ports::EventSink) port.  The
//! adapter on the other side decides what to do with them; in firmware that
//! is a log line.

use std::net::Ipv4Addr;

use crate::error::{CommsError, DecodeError};
use crate::fsm::PowerState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The controller has started (carries the boot state).
    Started(PowerState),

    /// The power state machine completed a transition.
    StateChanged { from: PowerState, to: PowerState },

    /// A transition was requested along an edge the table forbids.
    TransitionRejected { from: PowerState, to: PowerState },

    /// Broker session is up and the handshake went out.
    LinkUp { broker: Ipv4Addr, attempts: u32 },

    /// An attempt to bring the link up, or the live session, failed.
    LinkLost(CommsError),

    /// State notification published.
    NotificationSent { state: PowerState, timestamp: i64 },

    /// A probe was echoed on the pong topic.
    PongSent { timestamp: Option<i64> },

    /// A command payload could not be decoded and was dropped.
    CommandDiscarded(DecodeError),

    /// An operator asked for a restart.
    RestartRequested,
}
