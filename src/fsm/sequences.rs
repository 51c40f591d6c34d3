//! Entry sequences and the state table.
//!
//! ```text
//!   OFF ──[trigger / AUX cmd]──▶ AUX ──[secondary trigger / PWR cmd]──▶ PWR
//!    ▲                            │                                      │
//!    └────────────[OFF cmd]───────┴──────────────[OFF cmd]───────────────┘
//! ```
//!
//! The AUX sequence walks the host through its firmware stages by pressing
//! and releasing the power button several times.  The fan stays on except
//! for one deliberate 2 s reprieve in the middle.  Timings are part of the
//! hardware contract; do not tune them.

use super::{PowerState, StateDescriptor};
use crate::actuation::ActuationStep;
use crate::pins::OutputId::{Cooling, Relay, Secondary};

/// OFF → AUX.  16 s in total.
pub const AUX_SEQUENCE: &[ActuationStep] = &[
    ActuationStep::high(Cooling, 0),
    ActuationStep::high(Relay, 2000),
    ActuationStep::low(Relay, 1000),
    ActuationStep::high(Relay, 2000),
    ActuationStep::low(Cooling, 0),
    ActuationStep::low(Relay, 2000),
    ActuationStep::high(Cooling, 0),
    ActuationStep::high(Relay, 2000),
    ActuationStep::low(Relay, 2000),
    ActuationStep::high(Secondary, 5000),
    ActuationStep::low(Cooling, 0),
];

/// AUX → PWR.  Steady-state configuration, no pulses.
pub const PWR_SEQUENCE: &[ActuationStep] = &[
    ActuationStep::high(Cooling, 0),
    ActuationStep::low(Relay, 0),
    ActuationStep::high(Secondary, 0),
];

/// Any → OFF.
pub const OFF_SEQUENCE: &[ActuationStep] = &[
    ActuationStep::low(Cooling, 0),
    ActuationStep::low(Relay, 0),
    ActuationStep::low(Secondary, 0),
];

fn off_accepts(_from: PowerState) -> bool {
    true
}

fn aux_accepts(from: PowerState) -> bool {
    from == PowerState::Off
}

fn pwr_accepts(from: PowerState) -> bool {
    from == PowerState::Aux
}

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; PowerState::COUNT] {
    [
        // Index 0: Off
        StateDescriptor {
            id: PowerState::Off,
            name: "OFF",
            on_enter: OFF_SEQUENCE,
            accepts_from: off_accepts,
        },
        // Index 1: Aux
        StateDescriptor {
            id: PowerState::Aux,
            name: "AUX",
            on_enter: AUX_SEQUENCE,
            accepts_from: aux_accepts,
        },
        // Index 2: Pwr
        StateDescriptor {
            id: PowerState::Pwr,
            name: "PWR",
            on_enter: PWR_SEQUENCE,
            accepts_from: pwr_accepts,
        },
    ]
}
