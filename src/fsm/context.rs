//! Everything a step handler can touch while a phase runs.
//!
//! `StepContext` is rebuilt for every phase from split borrows of the
//! [`PhaseRunner`](super::PhaseRunner) plus the run's event sink and
//! operator gate.  Its actuator handle is a [`PhaseScope`]: dropping the
//! context, on any path out of the phase, releases the phase's outputs.

use core::ops::{Deref, DerefMut};

use log::{debug, error};

use crate::app::cancel::CancelFlag;
use crate::app::events::WashEvent;
use crate::app::ports::{Clock, DigitalIo, EventSink, OperatorGate};
use crate::drivers::actuators::ActuatorSet;
use crate::error::HardwareFault;
use crate::phase::Phase;
use crate::pins::PinRole;
use crate::sensors::level::LevelSensor;

use super::{FluidLine, PhaseState, StepTiming};

// ---------------------------------------------------------------------------
// Scope guard
// ---------------------------------------------------------------------------

/// Actuator access for the duration of one phase.
///
/// On drop the phase indicator is switched off and
/// [`ActuatorSet::shutdown_all`] runs, once, whatever ended the phase.
pub struct PhaseScope<'a, IO: DigitalIo> {
    actuators: &'a mut ActuatorSet<IO>,
    phase: Phase,
}

impl<'a, IO: DigitalIo> PhaseScope<'a, IO> {
    pub fn new(actuators: &'a mut ActuatorSet<IO>, phase: Phase) -> Self {
        Self { actuators, phase }
    }

    /// Switch this phase's indicator LED on.
    pub fn light_indicator(&mut self) -> Result<(), HardwareFault> {
        self.actuators.set(PinRole::PhaseIndicator(self.phase), true)
    }
}

impl<IO: DigitalIo> Deref for PhaseScope<'_, IO> {
    type Target = ActuatorSet<IO>;

    fn deref(&self) -> &Self::Target {
        self.actuators
    }
}

impl<IO: DigitalIo> DerefMut for PhaseScope<'_, IO> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.actuators
    }
}

impl<IO: DigitalIo> Drop for PhaseScope<'_, IO> {
    fn drop(&mut self) {
        let indicator = PinRole::PhaseIndicator(self.phase);
        if self.actuators.is_initialized() {
            if let Err(e) = self.actuators.set(indicator, false) {
                error!("phase {}: indicator off: {e}", self.phase);
            }
        }
        self.actuators.shutdown_all();
        debug!("phase {}: outputs released", self.phase);
    }
}

// ---------------------------------------------------------------------------
// Step context
// ---------------------------------------------------------------------------

pub struct StepContext<'a, IO: DigitalIo, C> {
    pub phase: Phase,
    pub actuators: PhaseScope<'a, IO>,
    pub water: &'a mut LevelSensor<C>,
    pub disinfectant: &'a mut LevelSensor<C>,
    pub clock: &'a C,
    pub cancel: &'a CancelFlag,
    pub timing: &'a StepTiming,
    pub events: &'a mut dyn EventSink,
    pub gate: &'a mut dyn OperatorGate,
    /// Current sub-step.
    pub state: PhaseState,
    /// Fill timeouts seen so far in this phase.
    pub warnings: u8,
}

impl<IO: DigitalIo, C: Clock> StepContext<'_, IO, C> {
    /// Record and publish a state change.
    pub fn enter(&mut self, state: PhaseState) {
        if self.state == state {
            return;
        }
        debug!("phase {}: {} -> {}", self.phase, self.state, state);
        self.state = state;
        self.events.emit(&WashEvent::StepEntered {
            phase: self.phase,
            state,
        });
    }

    pub fn emit(&mut self, event: &WashEvent) {
        self.events.emit(event);
    }

    pub fn sensor_mut(&mut self, line: FluidLine) -> &mut LevelSensor<C> {
        match line {
            FluidLine::Water => &mut *self.water,
            FluidLine::Disinfectant => &mut *self.disinfectant,
        }
    }
}
