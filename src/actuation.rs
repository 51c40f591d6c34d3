//! Generic actuation sequencer.
//!
//! Hardware choreography is data: an ordered slice of [`ActuationStep`]s
//! replayed by [`run_sequence`].  Each step drives one output and then
//! holds for its duration before the next step starts.
//!
//! The call blocks for the sum of all holds.  There is no cancellation and
//! no rollback; a sequence runs to the end or the device restarts.

use log::debug;

use crate::app::ports::{DelayPort, OutputPort};
use crate::pins::{Level, OutputId};

/// One immutable (output, level, hold) instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuationStep {
    pub output: OutputId,
    pub level: Level,
    /// Hold after the write, before the next step (ms).  Zero = no pause.
    pub hold_ms: u32,
}

impl ActuationStep {
    pub const fn new(output: OutputId, level: Level, hold_ms: u32) -> Self {
        Self { output, level, hold_ms }
    }

    pub const fn high(output: OutputId, hold_ms: u32) -> Self {
        Self::new(output, Level::High, hold_ms)
    }

    pub const fn low(output: OutputId, hold_ms: u32) -> Self {
        Self::new(output, Level::Low, hold_ms)
    }
}

/// Replay `steps` in order against `hw`.
pub fn run_sequence(steps: &[ActuationStep], hw: &mut (impl OutputPort + DelayPort)) {
    for step in steps {
        debug!(
            "step: {} (GPIO{}) -> {:?}, hold {}ms",
            step.output.name(),
            step.output.gpio(),
            step.level,
            step.hold_ms
        );
        hw.set_output(step.output, step.level);
        if step.hold_ms > 0 {
            hw.delay_ms(step.hold_ms);
        }
    }
}

/// Total blocking time of a sequence.
pub fn sequence_duration_ms(steps: &[ActuationStep]) -> u32 {
    steps.iter().map(|s| s.hold_ms).sum()
}
