//! Controller status: the single piece of mutable state the loop owns.
//!
//! `ControllerStatus` is created once at boot, passed by reference to each
//! component, and discarded on restart.  The power state field is private:
//! only [`PowerStateMachine`](super::PowerStateMachine) commits it.

use super::PowerState;

/// Live status of the shield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerStatus {
    current_state: PowerState,
    /// A broker session is open and subscribed.
    pub link_connected: bool,
    /// The publisher owes the bus a state notification.
    pub pending_notification: bool,
    /// Epoch seconds carried by the most recent probe.
    last_ping_timestamp: i64,
    /// Local monotonic ms at which that probe was answered.
    last_ping_received_at: u64,
}

impl Default for ControllerStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerStatus {
    pub fn new() -> Self {
        Self {
            current_state: PowerState::Off,
            link_connected: false,
            pending_notification: false,
            last_ping_timestamp: 0,
            last_ping_received_at: 0,
        }
    }

    pub fn state(&self) -> PowerState {
        self.current_state
    }

    pub(super) fn commit_state(&mut self, state: PowerState) {
        self.current_state = state;
    }

    /// Anchor the borrowed wall clock to a probe's timestamp.
    pub fn record_ping(&mut self, timestamp: i64, received_at_ms: u64) {
        self.last_ping_timestamp = timestamp;
        self.last_ping_received_at = received_at_ms;
    }

    pub fn last_ping_timestamp(&self) -> i64 {
        self.last_ping_timestamp
    }

    pub fn last_ping_received_at(&self) -> u64 {
        self.last_ping_received_at
    }

    /// Approximate epoch seconds at `now_ms`, borrowed from the last probe.
    pub fn reconstructed_timestamp(&self, now_ms: u64) -> i64 {
        crate::heartbeat::reconstruct_timestamp(
            self.last_ping_timestamp,
            self.last_ping_received_at,
            now_ms,
        )
    }
}
