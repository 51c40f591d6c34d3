//! Inbound message routing.
//!
//! Classifies a `(topic, payload)` pair by [`TopicRole`] and turns it into
//! something the controller can act on.  Pure: no state, no I/O.

use crate::app::commands::Command;
use crate::codec;
use crate::error::DecodeError;
use crate::heartbeat::PingProbe;
use crate::topics::{TopicRole, TopicTable};

/// Result of routing one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A decoded command for the state machine.
    Command(Command),
    /// A liveness probe to answer on the next cycle.
    Ping(PingProbe),
    /// Payload on a known topic that could not be used.
    Discarded(DecodeError),
    /// Topic this device does not handle.
    Ignored,
}

pub fn route_inbound(
    topics: &TopicTable,
    topic: &str,
    payload: &[u8],
    max_payload: usize,
) -> Inbound {
    let Some(role) = topics.classify(topic) else {
        return Inbound::Ignored;
    };

    match role {
        TopicRole::Command | TopicRole::DeviceCommand if payload.len() > max_payload => {
            Inbound::Discarded(DecodeError::Oversized)
        }
        TopicRole::Command | TopicRole::DeviceCommand => match codec::decode_command(payload) {
            Ok(cmd) => Inbound::Command(cmd),
            Err(e) => Inbound::Discarded(e),
        },
        // Opaque: echoed back whatever its size.
        TopicRole::Ping => Inbound::Ping(PingProbe::capture(payload)),
        // classify() only yields inbound roles
        TopicRole::Handshake | TopicRole::StateNotify | TopicRole::Pong => Inbound::Ignored,
    }
}
