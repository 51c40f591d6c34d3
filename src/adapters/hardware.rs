//! Hardware adapter: bridges GPIO pins to the board port traits.
//!
//! [`GpioBoard`] is generic over `embedded-hal` 1.0 pins and delay, so the
//! same code drives `esp_idf_hal::gpio::PinDriver`s in firmware and
//! [`SimPin`]s in the host simulation.  This is the only module that
//! touches digital lines.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use log::warn;

use crate::adapters::time::MonotonicClock;
use crate::app::ports::{ClockPort, DelayPort, InputPort, OutputPort};
use crate::pins::{InputId, Level, OutputId};

/// Output pins indexed by [`OutputId`], input pins by [`InputId`].
pub struct GpioBoard<O, I, D> {
    outputs: [O; OutputId::COUNT],
    inputs: [I; InputId::COUNT],
    levels: [Level; OutputId::COUNT],
    delay: D,
    clock: MonotonicClock,
}

impl<O: OutputPin, I: InputPin, D: DelayNs> GpioBoard<O, I, D> {
    /// `outputs` in [`OutputId::ALL`] order, `inputs` in [`InputId::ALL`]
    /// order.  Every output is driven low before this returns.
    pub fn new(outputs: [O; OutputId::COUNT], inputs: [I; InputId::COUNT], delay: D) -> Self {
        let mut board = Self {
            outputs,
            inputs,
            levels: [Level::Low; OutputId::COUNT],
            delay,
            clock: MonotonicClock::new(),
        };
        for id in OutputId::ALL {
            board.set_output(id, Level::Low);
        }
        board
    }
}

impl<O: OutputPin, I, D> OutputPort for GpioBoard<O, I, D> {
    fn set_output(&mut self, id: OutputId, level: Level) {
        let pin = &mut self.outputs[id as usize];
        let result = if level.is_high() {
            pin.set_high()
        } else {
            pin.set_low()
        };
        if let Err(e) = result {
            warn!("GPIO{} ({}) write failed: {:?}", id.gpio(), id.name(), e);
        }
        self.levels[id as usize] = level;
    }

    fn output_level(&self, id: OutputId) -> Level {
        self.levels[id as usize]
    }
}

impl<O, I: InputPin, D> InputPort for GpioBoard<O, I, D> {
    /// A failed read counts as the idle (pulled-up) level.
    fn input_level(&mut self, id: InputId) -> Level {
        match self.inputs[id as usize].is_high() {
            Ok(high) => Level::from(high),
            Err(e) => {
                warn!("GPIO{} ({}) read failed: {:?}", id.gpio(), id.name(), e);
                Level::High
            }
        }
    }
}

impl<O, I, D: DelayNs> DelayPort for GpioBoard<O, I, D> {
    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

impl<O, I, D> ClockPort for GpioBoard<O, I, D> {
    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}

// ── Simulation pin ────────────────────────────────────────────

/// In-memory digital line for the host simulation.  Reads back whatever
/// was last written; starts high (an idle, pulled-up input).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPin {
    high: bool,
}

impl Default for SimPin {
    fn default() -> Self {
        Self { high: true }
    }
}

impl SimPin {
    pub fn new(high: bool) -> Self {
        Self { high }
    }
}

impl ErrorType for SimPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}
