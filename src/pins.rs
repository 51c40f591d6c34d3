//! GPIO assignments for the PwrShield board.
//!
//! Single source of truth: the sequencer, the input poller and the boot
//! code all go through [`OutputId`] / [`InputId`] rather than raw pin
//! numbers.  `main.rs` takes the matching `peripherals.pins.gpioNN` for each
//! entry; keep both in sync.

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Relay in parallel with the host's power button.
pub const RELAY_POWER_GPIO: i32 = 14;
/// Keeps the downstream keyboard/peripheral "pressed" (secondary output).
pub const KBD_POWER_GPIO: i32 = 12;
/// Cooling fan MOSFET.  Doubles as the "still connecting" blink indicator.
pub const FAN_POWER_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Inputs (active-low)
// ---------------------------------------------------------------------------

/// External trigger requesting OFF → AUX.
pub const RELAY_IN_GPIO: i32 = 16;
/// External trigger requesting AUX → PWR.  Internal pull-up enabled.
pub const KBD_IN_GPIO: i32 = 4;

/// Logic level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Self::High
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

/// Digital outputs driven by the sequencer.  Used as a table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OutputId {
    Relay = 0,
    Secondary = 1,
    Cooling = 2,
}

impl OutputId {
    pub const COUNT: usize = 3;
    pub const ALL: [Self; Self::COUNT] = [Self::Relay, Self::Secondary, Self::Cooling];

    pub const fn gpio(self) -> i32 {
        match self {
            Self::Relay => RELAY_POWER_GPIO,
            Self::Secondary => KBD_POWER_GPIO,
            Self::Cooling => FAN_POWER_GPIO,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Relay => "RELAY_POWER",
            Self::Secondary => "KBD_POWER",
            Self::Cooling => "FAN_POWER",
        }
    }
}

/// Polled digital inputs.  Used as a table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InputId {
    Trigger = 0,
    SecondaryTrigger = 1,
}

impl InputId {
    pub const COUNT: usize = 2;
    pub const ALL: [Self; Self::COUNT] = [Self::Trigger, Self::SecondaryTrigger];

    pub const fn gpio(self) -> i32 {
        match self {
            Self::Trigger => RELAY_IN_GPIO,
            Self::SecondaryTrigger => KBD_IN_GPIO,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Trigger => "RELAY_IN",
            Self::SecondaryTrigger => "KBD_IN",
        }
    }
}
