//! Pin roles and their BCM pin assignments on the washer control board.
//!
//! Single source of truth: every backend references this module rather than
//! hard-coding pin numbers.  The mapping is loaded once at startup as part
//! of [`WasherConfig`](crate::config::WasherConfig) and never changes while
//! a run is active.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::phase::Phase;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Every actuator and sensor the controller knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinRole {
    InletValve,
    DrainValve,
    WaterPump,
    DisinfectInlet,
    DisinfectDrain,
    DisinfectPump,
    AirPump,
    StatusLed,
    ErrorLed,
    Buzzer,
    WaterLevelSensor,
    DisinfectLevelSensor,
    /// "Phase active" indicator, one per phase.
    PhaseIndicator(Phase),
}

impl PinRole {
    /// Total number of roles.
    pub const COUNT: usize = 12 + Phase::COUNT;

    /// Valves and pumps: everything that moves liquid or air.
    /// These must all be off between phases and on every exit path.
    pub const POWER: [PinRole; 7] = [
        Self::InletValve,
        Self::DrainValve,
        Self::WaterPump,
        Self::DisinfectInlet,
        Self::DisinfectDrain,
        Self::DisinfectPump,
        Self::AirPump,
    ];

    /// Level sensor inputs.
    pub const INPUTS: [PinRole; 2] = [Self::WaterLevelSensor, Self::DisinfectLevelSensor];

    /// Every output role (power, signalling, phase indicators).
    pub const OUTPUTS: [PinRole; 15] = [
        Self::InletValve,
        Self::DrainValve,
        Self::WaterPump,
        Self::DisinfectInlet,
        Self::DisinfectDrain,
        Self::DisinfectPump,
        Self::AirPump,
        Self::StatusLed,
        Self::ErrorLed,
        Self::Buzzer,
        Self::PhaseIndicator(Phase::DetergentWash),
        Self::PhaseIndicator(Phase::Rinsing),
        Self::PhaseIndicator(Phase::Disinfecting),
        Self::PhaseIndicator(Phase::FinalRinse),
        Self::PhaseIndicator(Phase::AirFlush),
    ];

    /// Dense index, usable for `[T; PinRole::COUNT]` tables.
    pub const fn index(self) -> usize {
        match self {
            Self::InletValve => 0,
            Self::DrainValve => 1,
            Self::WaterPump => 2,
            Self::DisinfectInlet => 3,
            Self::DisinfectDrain => 4,
            Self::DisinfectPump => 5,
            Self::AirPump => 6,
            Self::StatusLed => 7,
            Self::ErrorLed => 8,
            Self::Buzzer => 9,
            Self::WaterLevelSensor => 10,
            Self::DisinfectLevelSensor => 11,
            Self::PhaseIndicator(phase) => 12 + phase.index(),
        }
    }

    pub const fn is_input(self) -> bool {
        matches!(self, Self::WaterLevelSensor | Self::DisinfectLevelSensor)
    }

    pub const fn is_power(self) -> bool {
        self.index() <= Self::AirPump.index()
    }
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InletValve => write!(f, "inlet valve"),
            Self::DrainValve => write!(f, "drain valve"),
            Self::WaterPump => write!(f, "water pump"),
            Self::DisinfectInlet => write!(f, "disinfectant inlet"),
            Self::DisinfectDrain => write!(f, "disinfectant drain"),
            Self::DisinfectPump => write!(f, "disinfectant pump"),
            Self::AirPump => write!(f, "air pump"),
            Self::StatusLed => write!(f, "status LED"),
            Self::ErrorLed => write!(f, "error LED"),
            Self::Buzzer => write!(f, "buzzer"),
            Self::WaterLevelSensor => write!(f, "water level sensor"),
            Self::DisinfectLevelSensor => write!(f, "disinfectant level sensor"),
            Self::PhaseIndicator(phase) => write!(f, "{phase} indicator"),
        }
    }
}

// ---------------------------------------------------------------------------
// BCM pin map
// ---------------------------------------------------------------------------

/// BCM GPIO number for every role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinMap {
    // --- Water line ---
    pub inlet_valve: u8,
    pub drain_valve: u8,
    pub water_pump: u8,
    pub water_level_sensor: u8,

    // --- Disinfectant line ---
    pub disinfect_inlet: u8,
    pub disinfect_drain: u8,
    pub disinfect_pump: u8,
    pub disinfect_level_sensor: u8,

    // --- Air line ---
    pub air_pump: u8,

    // --- Signalling ---
    pub status_led: u8,
    pub error_led: u8,
    pub buzzer: u8,

    /// Phase indicators, indexed by [`Phase::index`].
    pub phase_indicators: [u8; Phase::COUNT],
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            inlet_valve: 23,
            drain_valve: 24,
            water_pump: 25,
            water_level_sensor: 26,

            disinfect_inlet: 16,
            disinfect_drain: 20,
            disinfect_pump: 19,
            disinfect_level_sensor: 21,

            air_pump: 4,

            status_led: 5,
            error_led: 6,
            buzzer: 13,

            // Detergent Wash, Rinsing, Disinfecting, Final Rinse, Air-flush
            phase_indicators: [18, 17, 27, 22, 12],
        }
    }
}

impl PinMap {
    /// BCM number assigned to `role`.
    pub fn bcm(&self, role: PinRole) -> u8 {
        match role {
            PinRole::InletValve => self.inlet_valve,
            PinRole::DrainValve => self.drain_valve,
            PinRole::WaterPump => self.water_pump,
            PinRole::DisinfectInlet => self.disinfect_inlet,
            PinRole::DisinfectDrain => self.disinfect_drain,
            PinRole::DisinfectPump => self.disinfect_pump,
            PinRole::AirPump => self.air_pump,
            PinRole::StatusLed => self.status_led,
            PinRole::ErrorLed => self.error_led,
            PinRole::Buzzer => self.buzzer,
            PinRole::WaterLevelSensor => self.water_level_sensor,
            PinRole::DisinfectLevelSensor => self.disinfect_level_sensor,
            PinRole::PhaseIndicator(phase) => self.phase_indicators[phase.index()],
        }
    }

    /// The first role whose pin is already used by an earlier role, if any.
    pub fn find_duplicate(&self) -> Option<PinRole> {
        let mut seen = [false; 64];
        PinRole::OUTPUTS
            .iter()
            .chain(PinRole::INPUTS.iter())
            .copied()
            .find(|role| {
                let pin = self.bcm(*role) as usize;
                if pin >= seen.len() {
                    return false;
                }
                core::mem::replace(&mut seen[pin], true)
            })
    }
}
