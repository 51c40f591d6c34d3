//! Table-driven power state machine.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │  StateTable                                           │
//! │  ┌────────────┬──────────────┬──────────────────────┐ │
//! │  │ PowerState │ on_enter     │ accepts_from         │ │
//! │  ├────────────┼──────────────┼──────────────────────┤ │
//! │  │ Off        │ OFF_SEQUENCE │ any                  │ │
//! │  │ Aux        │ AUX_SEQUENCE │ Off                  │ │
//! │  │ Pwr        │ PWR_SEQUENCE │ Aux                  │ │
//! │  └────────────┴──────────────┴──────────────────────┘ │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! A transition request is validated against the target row, the row's
//! entry sequence is replayed by the [sequencer](crate::actuation), and
//! only then is the new state committed and a notification flagged.

pub mod sequences;
pub mod status;

use core::fmt;
use core::str::FromStr;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::actuation::{self, ActuationStep};
use crate::app::ports::{DelayPort, OutputPort};
use status::ControllerStatus;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Logical power state of the host machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum PowerState {
    Off = 0,
    Aux = 1,
    Pwr = 2,
}

impl PowerState {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Aux => "AUX",
            Self::Pwr => "PWR",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PowerState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OFF" => Ok(Self::Off),
            "AUX" => Ok(Self::Aux),
            "PWR" => Ok(Self::Pwr),
            _ => Err(()),
        }
    }
}

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Predicate over the state being left.
pub type AcceptsFn = fn(PowerState) -> bool;

/// Static descriptor for a single power state.
pub struct StateDescriptor {
    pub id: PowerState,
    pub name: &'static str,
    /// Replayed on entry.
    pub on_enter: &'static [ActuationStep],
    pub accepts_from: AcceptsFn,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The power state machine.
///
/// Holds only the immutable table; the current state lives in the
/// [`ControllerStatus`] owned by the control loop.
pub struct PowerStateMachine {
    table: [StateDescriptor; PowerState::COUNT],
}

impl Default for PowerStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerStateMachine {
    pub fn new() -> Self {
        Self {
            table: sequences::build_state_table(),
        }
    }

    /// Whether `from → to` is a legal, non-trivial transition.
    pub fn permits(&self, from: PowerState, to: PowerState) -> bool {
        from != to && (self.table[to as usize].accepts_from)(from)
    }

    /// Move to `target`, running its entry sequence.
    ///
    /// Returns `true` only if a sequence ran.  Requesting the current state
    /// or an illegal edge leaves outputs and flags untouched.
    pub fn request_transition(
        &self,
        target: PowerState,
        status: &mut ControllerStatus,
        hw: &mut (impl OutputPort + DelayPort),
    ) -> bool {
        let current = status.state();
        if current == target {
            return false;
        }
        if !self.permits(current, target) {
            warn!(
                "FSM: rejected {} -> {}",
                self.table[current as usize].name, self.table[target as usize].name
            );
            return false;
        }

        let row = &self.table[target as usize];
        info!(
            "FSM transition: {} -> {} ({} steps, {}ms)",
            self.table[current as usize].name,
            row.name,
            row.on_enter.len(),
            actuation::sequence_duration_ms(row.on_enter)
        );
        actuation::run_sequence(row.on_enter, hw);

        status.commit_state(target);
        status.pending_notification = true;
        true
    }

    /// Drive every output straight to the final level `state` implies,
    /// skipping holds.  Status is not touched.  Used at boot.
    pub fn apply_outputs(&self, state: PowerState, hw: &mut impl OutputPort) {
        for step in self.table[state as usize].on_enter {
            hw.set_output(step.output, step.level);
        }
    }
}
