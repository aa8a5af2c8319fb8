//! The fixed set of wash phases and their per-run settings.
//!
//! Declaration order of [`Phase`] *is* the canonical execution order, so
//! sorting a selection by `Phase` is all the orchestrator needs to do.

use core::fmt;

use serde::{Deserialize, Serialize};

/// One named stage of the wash cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "Detergent Wash")]
    DetergentWash,
    #[serde(rename = "Rinsing")]
    Rinsing,
    #[serde(rename = "Disinfecting")]
    Disinfecting,
    #[serde(rename = "Final Rinse")]
    FinalRinse,
    #[serde(rename = "Air-flush")]
    AirFlush,
}

impl Phase {
    /// Total number of phases.
    pub const COUNT: usize = 5;

    /// Every phase, in canonical order.
    pub const ALL: [Phase; Self::COUNT] = [
        Self::DetergentWash,
        Self::Rinsing,
        Self::Disinfecting,
        Self::FinalRinse,
        Self::AirFlush,
    ];

    /// Position in the canonical order.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name, as shown on the display and in the history log.
    pub const fn name(self) -> &'static str {
        match self {
            Self::DetergentWash => "Detergent Wash",
            Self::Rinsing => "Rinsing",
            Self::Disinfecting => "Disinfecting",
            Self::FinalRinse => "Final Rinse",
            Self::AirFlush => "Air-flush",
        }
    }

    /// Parse a CLI-style slug (`detergent-wash`, `final_rinse`, `air`).
    pub fn from_slug(slug: &str) -> Option<Self> {
        let normalized = slug.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "detergent-wash" | "detergent" | "wash" => Some(Self::DetergentWash),
            "rinsing" | "rinse" => Some(Self::Rinsing),
            "disinfecting" | "disinfect" => Some(Self::Disinfecting),
            "final-rinse" | "final" => Some(Self::FinalRinse),
            "air-flush" | "air" | "flush" => Some(Self::AirFlush),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shortest allowed phase duration.
pub const MIN_DURATION_MINUTES: u8 = 5;
/// Longest allowed phase duration.
pub const MAX_DURATION_MINUTES: u8 = 60;
/// Durations must be a multiple of this.
pub const DURATION_STEP_MINUTES: u8 = 5;

/// A selected phase together with its configured duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSetting {
    pub phase: Phase,
    pub duration_minutes: u8,
}

impl PhaseSetting {
    pub const fn new(phase: Phase, duration_minutes: u8) -> Self {
        Self {
            phase,
            duration_minutes,
        }
    }

    /// Setting with the default (shortest) duration.
    pub const fn with_default_duration(phase: Phase) -> Self {
        Self::new(phase, MIN_DURATION_MINUTES)
    }

    /// True if the duration lies in 5..=60 on a 5-minute step.
    pub fn duration_is_valid(&self) -> bool {
        (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.duration_minutes)
            && self.duration_minutes % DURATION_STEP_MINUTES == 0
    }

    /// Treat duration in whole seconds.
    pub fn duration_secs(&self) -> u32 {
        u32::from(self.duration_minutes) * 60
    }
}
