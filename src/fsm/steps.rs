//! Step handlers.
//!
//! Each handler drives its own valves and pumps back off before returning
//! normally.  On an early return (abort, fault) the enclosing
//! [`PhaseScope`](super::context::PhaseScope) switches everything off.

use std::time::Duration;

use log::{info, warn};

use crate::app::events::WashEvent;
use crate::app::ports::{Clock, Confirmation, DigitalIo};
use crate::config::FillTimeoutPolicy;
use crate::error::HardwareFault;
use crate::pins::PinRole;
use crate::sensors::level::LevelWait;

use super::context::StepContext;
use super::{FluidLine, StepFlow};

const ADDITIVE_PROMPT: &str = "Add detergent to the wash basin, then confirm to continue.";

impl<IO: DigitalIo, C: Clock> StepContext<'_, IO, C> {
    // ── Filling ────────────────────────────────────────────────

    pub(super) fn fill(&mut self, line: FluidLine) -> Result<StepFlow, HardwareFault> {
        self.sensor_mut(line).reset();

        self.actuators.set(line.inlet(), true)?;
        for &drain in line.drains() {
            self.actuators.set(drain, false)?;
        }
        self.actuators.set(line.pump(), true)?;

        let waited = self.wait_full(line);

        // Inlet and pump close on every outcome.
        let closed = self
            .actuators
            .set(line.inlet(), false)
            .and_then(|()| self.actuators.set(line.pump(), false));
        let waited = waited?;
        closed?;

        match waited {
            LevelWait::Reached => {
                info!("phase {}: {line} tank full", self.phase);
                Ok(StepFlow::Continue)
            }
            LevelWait::Cancelled => Ok(StepFlow::Aborted),
            LevelWait::TimedOut => {
                warn!(
                    "phase {}: {line} level not reached within {}s",
                    self.phase,
                    self.timing.fill_timeout.as_secs()
                );
                self.warnings = self.warnings.saturating_add(1);
                self.emit(&WashEvent::LevelTimeout {
                    phase: self.phase,
                    line,
                });
                match self.timing.fill_policy {
                    FillTimeoutPolicy::Warn => Ok(StepFlow::Continue),
                    FillTimeoutPolicy::Fail => Ok(StepFlow::Failed("tank level not reached")),
                }
            }
        }
    }

    fn wait_full(&mut self, line: FluidLine) -> Result<LevelWait, HardwareFault> {
        let phase = self.phase;
        let sensor = match line {
            FluidLine::Water => &mut *self.water,
            FluidLine::Disinfectant => &mut *self.disinfectant,
        };
        let events = &mut *self.events;
        sensor.wait_for_level(
            self.actuators.io_mut(),
            self.cancel,
            true,
            self.timing.fill_timeout,
            |remaining_secs| {
                events.emit(&WashEvent::FillCountdown {
                    phase,
                    line,
                    remaining_secs,
                });
            },
        )
    }

    // ── Operator gate ──────────────────────────────────────────

    pub(super) fn await_additive(&mut self) -> StepFlow {
        match self.gate.confirm(ADDITIVE_PROMPT) {
            Confirmation::Proceed => StepFlow::Continue,
            Confirmation::Declined => StepFlow::Failed("detergent not confirmed"),
            Confirmation::Cancelled => {
                self.cancel.request();
                StepFlow::Aborted
            }
        }
    }

    // ── Treating / flushing ────────────────────────────────────

    pub(super) fn treat(&mut self, secs: u32, circulate: bool) -> Result<StepFlow, HardwareFault> {
        if circulate {
            self.actuators.set(PinRole::WaterPump, true)?;
        }
        let flow = self.countdown(secs);
        if circulate {
            self.actuators.set(PinRole::WaterPump, false)?;
        }
        Ok(flow)
    }

    pub(super) fn flush(&mut self, secs: u32) -> Result<StepFlow, HardwareFault> {
        // Air must never be pushed through an open or wet path.
        self.actuators.shutdown_all();
        self.actuators.set(PinRole::AirPump, true)?;
        let flow = self.countdown(secs);
        self.actuators.set(PinRole::AirPump, false)?;
        Ok(flow)
    }

    /// One tick per second, checking for a stop request before each.
    fn countdown(&mut self, total_secs: u32) -> StepFlow {
        for remaining_secs in (1..=total_secs).rev() {
            if self.cancel.is_requested() {
                return StepFlow::Aborted;
            }
            self.emit(&WashEvent::TreatCountdown {
                phase: self.phase,
                remaining_secs,
            });
            self.clock.sleep(self.timing.treat_tick);
        }
        if self.cancel.is_requested() {
            StepFlow::Aborted
        } else {
            StepFlow::Continue
        }
    }

    // ── Draining / returning ───────────────────────────────────

    pub(super) fn drain(&mut self) -> Result<StepFlow, HardwareFault> {
        self.actuators.set(PinRole::DrainValve, true)?;
        let flow = self.hold_open(false);
        self.actuators.set(PinRole::DrainValve, false)?;
        Ok(flow)
    }

    pub(super) fn return_disinfectant(&mut self) -> Result<StepFlow, HardwareFault> {
        self.actuators.set(PinRole::DrainValve, false)?;
        self.actuators.set(PinRole::DisinfectDrain, true)?;
        self.actuators.set(PinRole::DisinfectPump, true)?;
        let flow = self.hold_open(true);
        self.actuators.set(PinRole::DisinfectDrain, false)?;
        self.actuators.set(PinRole::DisinfectPump, false)?;
        Ok(flow)
    }

    /// Hold the current drain path for the drain window.
    fn hold_open(&mut self, returning: bool) -> StepFlow {
        let window = self.timing.drain_window;
        let tick = self.timing.drain_tick.max(Duration::from_millis(1));
        let start = self.clock.now();
        loop {
            if self.cancel.is_requested() {
                return StepFlow::Aborted;
            }
            let elapsed = self.clock.now().saturating_sub(start);
            if elapsed >= window {
                return StepFlow::Continue;
            }
            let remaining = window - elapsed;
            self.emit(&WashEvent::DrainCountdown {
                phase: self.phase,
                returning,
                remaining_secs: remaining.as_secs() as u32,
            });
            self.clock.sleep(tick.min(remaining));
        }
    }
}
