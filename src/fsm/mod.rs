//! Per-phase state machine.
//!
//! Every phase is a linear walk over a short step plan drawn from a shared
//! vocabulary:
//!
//! ```text
//! ┌───────────────┬──────────────────────────────────────────────────┐
//! │ Phase         │ Steps                                            │
//! ├───────────────┼──────────────────────────────────────────────────┤
//! │ DetergentWash │ Fill(water) → AwaitAdditive → Treat → Drain      │
//! │ Rinsing       │ Fill(water) → Treat → Drain                      │
//! │ Disinfecting  │ Fill(disinfectant) → Treat → Return              │
//! │ FinalRinse    │ Fill(water) → Treat(circulating) → Drain         │
//! │ AirFlush      │ Flush                                            │
//! └───────────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! Before each step the runner checks the cancellation flag; a raised flag
//! moves the machine straight to [`PhaseState::Aborted`].  The whole walk is
//! wrapped in a [`context::PhaseScope`], so the phase indicator goes dark
//! and every valve and pump is switched off exactly once on any exit.

pub mod context;
mod steps;

use core::fmt;
use std::time::Duration;

use log::{info, warn};

use crate::app::cancel::CancelFlag;
use crate::app::ports::{Clock, DigitalIo, EventSink, OperatorGate};
use crate::config::{FillTimeoutPolicy, WasherConfig};
use crate::drivers::actuators::ActuatorSet;
use crate::drivers::signals::BuzzerPattern;
use crate::error::HardwareFault;
use crate::phase::{Phase, PhaseSetting};
use crate::pins::PinRole;
use crate::sensors::level::LevelSensor;

use context::{PhaseScope, StepContext};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseState {
    Idle,
    Filling,
    /// DetergentWash only: waiting for the operator to add detergent.
    ReadyForAdditive,
    Treating,
    Draining,
    /// Disinfecting only: liquid goes back to its own tank.
    Returning,
    Flushing,
    Done,
    Aborted,
}

impl PhaseState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "Idle",
            Self::Filling => "Filling",
            Self::ReadyForAdditive => "Add detergent",
            Self::Treating => "Treating",
            Self::Draining => "Draining",
            Self::Returning => "Returning",
            Self::Flushing => "Air flush",
            Self::Done => "Done",
            Self::Aborted => "Aborted",
        })
    }
}

// ---------------------------------------------------------------------------
// Fluid lines
// ---------------------------------------------------------------------------

/// One of the two plumbed circuits a fill can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FluidLine {
    Water,
    Disinfectant,
}

impl FluidLine {
    pub const fn inlet(self) -> PinRole {
        match self {
            Self::Water => PinRole::InletValve,
            Self::Disinfectant => PinRole::DisinfectInlet,
        }
    }

    pub const fn pump(self) -> PinRole {
        match self {
            Self::Water => PinRole::WaterPump,
            Self::Disinfectant => PinRole::DisinfectPump,
        }
    }

    pub const fn sensor(self) -> PinRole {
        match self {
            Self::Water => PinRole::WaterLevelSensor,
            Self::Disinfectant => PinRole::DisinfectLevelSensor,
        }
    }

    /// Drain paths that must be closed while this line fills.
    pub const fn drains(self) -> &'static [PinRole] {
        match self {
            Self::Water => &[PinRole::DrainValve],
            Self::Disinfectant => &[PinRole::DrainValve, PinRole::DisinfectDrain],
        }
    }
}

impl fmt::Display for FluidLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Water => "Water",
            Self::Disinfectant => "Disinfectant",
        })
    }
}

// ---------------------------------------------------------------------------
// Step plans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Fill(FluidLine),
    AwaitAdditive,
    /// Countdown for the configured duration; `circulate` keeps the water
    /// pump running throughout.
    Treat { circulate: bool },
    Drain,
    Return,
    Flush,
}

impl Step {
    pub const fn state(self) -> PhaseState {
        match self {
            Self::Fill(_) => PhaseState::Filling,
            Self::AwaitAdditive => PhaseState::ReadyForAdditive,
            Self::Treat { .. } => PhaseState::Treating,
            Self::Drain => PhaseState::Draining,
            Self::Return => PhaseState::Returning,
            Self::Flush => PhaseState::Flushing,
        }
    }
}

const DETERGENT_WASH: &[Step] = &[
    Step::Fill(FluidLine::Water),
    Step::AwaitAdditive,
    Step::Treat { circulate: false },
    Step::Drain,
];
const RINSING: &[Step] = &[
    Step::Fill(FluidLine::Water),
    Step::Treat { circulate: false },
    Step::Drain,
];
const DISINFECTING: &[Step] = &[
    Step::Fill(FluidLine::Disinfectant),
    Step::Treat { circulate: false },
    Step::Return,
];
const FINAL_RINSE: &[Step] = &[
    Step::Fill(FluidLine::Water),
    Step::Treat { circulate: true },
    Step::Drain,
];
const AIR_FLUSH: &[Step] = &[Step::Flush];

/// The fixed step sequence of a phase.
pub const fn plan(phase: Phase) -> &'static [Step] {
    match phase {
        Phase::DetergentWash => DETERGENT_WASH,
        Phase::Rinsing => RINSING,
        Phase::Disinfecting => DISINFECTING,
        Phase::FinalRinse => FINAL_RINSE,
        Phase::AirFlush => AIR_FLUSH,
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Control flow out of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepFlow {
    Continue,
    Aborted,
    Failed(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseResult {
    /// Every step ran to completion (sensor warnings allowed).
    Completed,
    /// A stop request interrupted the phase.
    Aborted,
    /// The phase's own logic gave up.
    Failed(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseReport {
    pub result: PhaseResult,
    /// Fill steps that timed out on their level sensor.
    pub warnings: u8,
}

impl PhaseReport {
    pub fn succeeded(&self) -> bool {
        self.result == PhaseResult::Completed
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Time budgets the steps run against, resolved from [`WasherConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTiming {
    pub fill_timeout: Duration,
    pub fill_policy: FillTimeoutPolicy,
    pub drain_window: Duration,
    pub drain_tick: Duration,
    pub treat_tick: Duration,
}

impl StepTiming {
    pub fn from_config(config: &WasherConfig) -> Self {
        Self {
            fill_timeout: Duration::from_secs(u64::from(config.level_sensor.fill_timeout_secs)),
            fill_policy: config.fill_timeout_policy,
            drain_window: Duration::from_secs(u64::from(config.timing.drain_window_secs)),
            drain_tick: Duration::from_millis(u64::from(config.timing.drain_tick_ms)),
            treat_tick: Duration::from_secs(1),
        }
    }
}

/// Executes one phase at a time against the actuators and level sensors.
pub struct PhaseRunner<IO, C> {
    actuators: ActuatorSet<IO>,
    water: LevelSensor<C>,
    disinfectant: LevelSensor<C>,
    clock: C,
    cancel: CancelFlag,
    timing: StepTiming,
    state: PhaseState,
}

impl<IO: DigitalIo, C: Clock + Clone> PhaseRunner<IO, C> {
    pub fn new(io: IO, clock: C, cancel: CancelFlag, config: &WasherConfig) -> Self {
        Self {
            actuators: ActuatorSet::new(io),
            water: LevelSensor::new(PinRole::WaterLevelSensor, clock.clone(), &config.level_sensor),
            disinfectant: LevelSensor::new(
                PinRole::DisinfectLevelSensor,
                clock.clone(),
                &config.level_sensor,
            ),
            clock,
            cancel,
            timing: StepTiming::from_config(config),
            state: PhaseState::Idle,
        }
    }

    /// State the last phase ended in (`Idle` before the first one).
    pub fn state(&self) -> PhaseState {
        self.state
    }

    pub fn timing(&self) -> &StepTiming {
        &self.timing
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn actuators(&self) -> &ActuatorSet<IO> {
        &self.actuators
    }

    pub fn actuators_mut(&mut self) -> &mut ActuatorSet<IO> {
        &mut self.actuators
    }

    /// Sound a buzzer pattern, blocking on the runner's clock.
    pub fn sound_pattern(&mut self, pattern: BuzzerPattern) -> Result<(), HardwareFault> {
        self.actuators.sound_pattern(pattern, &self.clock)
    }

    /// Run one phase to completion, abort or failure.
    ///
    /// A hardware fault ends the phase immediately and is returned as `Err`.
    /// Whatever the exit path, the phase indicator is off and every valve and
    /// pump is de-energised when this returns.
    pub fn run_phase(
        &mut self,
        setting: PhaseSetting,
        events: &mut dyn EventSink,
        gate: &mut dyn OperatorGate,
    ) -> Result<PhaseReport, HardwareFault> {
        let phase = setting.phase;
        info!("phase {phase}: starting ({} min)", setting.duration_minutes);

        let mut ctx = StepContext {
            phase,
            actuators: PhaseScope::new(&mut self.actuators, phase),
            water: &mut self.water,
            disinfectant: &mut self.disinfectant,
            clock: &self.clock,
            cancel: &self.cancel,
            timing: &self.timing,
            events,
            gate,
            state: PhaseState::Idle,
            warnings: 0,
        };

        let flow = ctx.actuators.light_indicator().and_then(|()| run_plan(&mut ctx, setting));
        let warnings = ctx.warnings;
        let terminal = match flow {
            Ok(StepFlow::Continue) => PhaseState::Done,
            _ => PhaseState::Aborted,
        };
        ctx.enter(terminal);
        drop(ctx);
        self.state = terminal;

        let result = match flow? {
            StepFlow::Continue => PhaseResult::Completed,
            StepFlow::Aborted => {
                info!("phase {phase}: aborted by stop request");
                PhaseResult::Aborted
            }
            StepFlow::Failed(reason) => {
                warn!("phase {phase}: failed: {reason}");
                PhaseResult::Failed(reason)
            }
        };
        Ok(PhaseReport { result, warnings })
    }
}

fn run_plan<IO: DigitalIo, C: Clock>(
    ctx: &mut StepContext<'_, IO, C>,
    setting: PhaseSetting,
) -> Result<StepFlow, HardwareFault> {
    for &step in plan(setting.phase) {
        if ctx.cancel.is_requested() {
            return Ok(StepFlow::Aborted);
        }
        ctx.enter(step.state());
        let flow = match step {
            Step::Fill(line) => ctx.fill(line)?,
            Step::AwaitAdditive => ctx.await_additive(),
            Step::Treat { circulate } => ctx.treat(setting.duration_secs(), circulate)?,
            Step::Drain => ctx.drain()?,
            Step::Return => ctx.return_disinfectant()?,
            Step::Flush => ctx.flush(setting.duration_secs())?,
        };
        if flow != StepFlow::Continue {
            return Ok(flow);
        }
    }
    Ok(StepFlow::Continue)
}
