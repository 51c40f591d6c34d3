//! JSON wire formats.
//!
//! | Direction | Payload                                                        |
//! |-----------|----------------------------------------------------------------|
//! | in        | `{"datahold":{"powerstate":"AUX"\|"PWR"\|"OFF"\|"RESET"}}`     |
//! | in        | `{"datahold":{"reset":true}}`                                  |
//! | in (ping) | anything containing `{"timestamp":<int>}`                      |
//! | out       | `{"timestamp":1}` (handshake)                                  |
//! | out       | `{"timestamp":<int>,"datahold":{"powerstate":"<state>"}}`      |
//!
//! Parsing itself is `serde_json`'s job; this module only maps documents to
//! domain values.

use serde::{Deserialize, Serialize};

use crate::app::commands::Command;
use crate::error::{CommsError, DecodeError};
use crate::fsm::PowerState;

/// Wire value requesting a restart.
pub const RESET_KEYWORD: &str = "RESET";

/// Timestamp value the handshake always carries.
pub const HANDSHAKE_TIMESTAMP: i64 = 1;

#[derive(Deserialize)]
struct InboundEnvelope {
    datahold: Option<InboundDatahold>,
}

#[derive(Deserialize)]
struct InboundDatahold {
    powerstate: Option<String>,
    #[serde(default)]
    reset: bool,
}

#[derive(Deserialize)]
struct TimestampEnvelope {
    timestamp: i64,
}

#[derive(Serialize)]
struct HandshakeEnvelope {
    timestamp: i64,
}

#[derive(Serialize)]
struct StateEnvelope {
    timestamp: i64,
    datahold: StateDatahold,
}

#[derive(Serialize)]
struct StateDatahold {
    powerstate: PowerState,
}

/// Decode a command-topic payload.
pub fn decode_command(payload: &[u8]) -> Result<Command, DecodeError> {
    let envelope: InboundEnvelope =
        serde_json::from_slice(payload).map_err(|_| DecodeError::Syntax)?;
    let datahold = envelope.datahold.ok_or(DecodeError::MissingDatahold)?;

    if datahold.reset {
        return Ok(Command::Reset);
    }
    match datahold.powerstate.as_deref() {
        None | Some("") => Err(DecodeError::MissingPowerState),
        Some(RESET_KEYWORD) => Ok(Command::Reset),
        Some(other) => other
            .parse::<PowerState>()
            .map(Command::SetPowerState)
            .map_err(|()| DecodeError::UnknownPowerState),
    }
}

/// Pull the top-level `timestamp` out of a probe, if there is one.
pub fn peek_timestamp(payload: &[u8]) -> Option<i64> {
    serde_json::from_slice::<TimestampEnvelope>(payload)
        .ok()
        .map(|e| e.timestamp)
}

pub fn encode_handshake() -> Result<Vec<u8>, CommsError> {
    serde_json::to_vec(&HandshakeEnvelope {
        timestamp: HANDSHAKE_TIMESTAMP,
    })
    .map_err(|_| CommsError::Encode)
}

pub fn encode_state_notify(timestamp: i64, state: PowerState) -> Result<Vec<u8>, CommsError> {
    serde_json::to_vec(&StateEnvelope {
        timestamp,
        datahold: StateDatahold { powerstate: state },
    })
    .map_err(|_| CommsError::Encode)
}
