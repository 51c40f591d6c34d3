//! Inbound commands to the controller.
//!
//! Produced by the [router](crate::router) from command-topic payloads or by
//! the trigger inputs, consumed immediately by
//! [`Controller::handle_command`](super::service::Controller::handle_command).
//! Never persisted.

use crate::fsm::PowerState;

/// Commands the outside world can issue to the shield.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Drive the host machine towards a power state.
    SetPowerState(PowerState),

    /// Restart the whole firmware.
    Reset,
}
