//! Outbound progress events.
//!
//! The controller emits these through the [`EventSink`](super::ports::EventSink)
//! port.  `Display` renders the short status string shown under the phase
//! label ("FILL 42s", "04:59", "DRAIN 10s"); [`WashEvent::phase`] gives the
//! label itself.

use core::fmt;

use crate::fsm::{FluidLine, PhaseState};
use crate::phase::Phase;

use super::record::{PhaseOutcome, RunStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WashEvent {
    /// The run passed validation and the status LED is on.
    RunStarted,

    /// A phase began executing.
    PhaseStarted(Phase),

    /// The phase state machine entered a new sub-step.
    StepEntered { phase: Phase, state: PhaseState },

    /// Waiting for a tank to report full.
    FillCountdown {
        phase: Phase,
        line: FluidLine,
        remaining_secs: u32,
    },

    /// Treat / flush timer tick.
    TreatCountdown { phase: Phase, remaining_secs: u32 },

    /// Drain or disinfectant-return window tick.
    DrainCountdown {
        phase: Phase,
        returning: bool,
        remaining_secs: u32,
    },

    /// A fill gave up on its level sensor (non-fatal warning).
    LevelTimeout { phase: Phase, line: FluidLine },

    /// A phase ended.
    PhaseFinished { phase: Phase, outcome: PhaseOutcome },

    /// The run ended and actuators are off.
    RunFinished(RunStatus),
}

impl WashEvent {
    /// The phase this event belongs to, for the "current phase" label.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::PhaseStarted(phase)
            | Self::StepEntered { phase, .. }
            | Self::FillCountdown { phase, .. }
            | Self::TreatCountdown { phase, .. }
            | Self::DrainCountdown { phase, .. }
            | Self::LevelTimeout { phase, .. }
            | Self::PhaseFinished { phase, .. } => Some(*phase),
            Self::RunStarted | Self::RunFinished(_) => None,
        }
    }

    /// True for events that should surface as an operator warning.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::LevelTimeout { .. })
    }
}

impl fmt::Display for WashEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunStarted => write!(f, "Starting"),
            Self::PhaseStarted(phase) => write!(f, "Running: {phase}"),
            Self::StepEntered { state, .. } => write!(f, "{state}"),
            Self::FillCountdown {
                line,
                remaining_secs,
                ..
            } => match line {
                FluidLine::Water => write!(f, "FILL {remaining_secs:02}s"),
                FluidLine::Disinfectant => write!(f, "D-FILL {remaining_secs:02}s"),
            },
            Self::TreatCountdown { remaining_secs, .. } => {
                write!(f, "{:02}:{:02}", remaining_secs / 60, remaining_secs % 60)
            }
            Self::DrainCountdown {
                returning,
                remaining_secs,
                ..
            } => {
                if *returning {
                    write!(f, "D-RETURN {remaining_secs:02}s")
                } else {
                    write!(f, "DRAIN {remaining_secs:02}s")
                }
            }
            Self::LevelTimeout { line, .. } => write!(
                f,
                "{line} level not reached in time, continuing; check sensor and supply"
            ),
            Self::PhaseFinished { outcome, .. } => write!(f, "{outcome}"),
            Self::RunFinished(status) => match status {
                RunStatus::Success => write!(f, "Completed"),
                RunStatus::StoppedByUser => write!(f, "Stopped by user"),
                RunStatus::Error | RunStatus::SystemError => write!(f, "ERROR detected"),
            },
        }
    }
}
