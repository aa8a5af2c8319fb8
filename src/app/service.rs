//! Washer service: the hexagonal core.
//!
//! [`WasherService`] owns the pins (through the phase runner), the clock and
//! the stop flag, and is the sole authority on how a run ends.  Everything
//! else it talks to arrives per run as [`RunPorts`].
//!
//! ```text
//!                 ┌───────────────────────────┐ ──▶ EventSink
//!  RunRequest ──▶ │       WasherService       │ ◀─▶ OperatorGate
//!                 │  PhaseRunner · ActuatorSet│ ──▶ RecordSink / ReportSink
//!                 └─────────────┬─────────────┘
//!                               ▼
//!                           DigitalIo
//! ```

use log::{error, info, warn};

use crate::config::WasherConfig;
use crate::drivers::actuators::ActuatorSet;
use crate::drivers::signals::BuzzerPattern;
use crate::error::{HardwareFault, ValidationError};
use crate::fsm::{PhaseResult, PhaseRunner};
use crate::pins::PinRole;

use super::cancel::CancelFlag;
use super::commands::{RunRequest, Selection};
use super::events::WashEvent;
use super::ports::{Clock, Confirmation, DigitalIo, OperatorGate, RunPorts};
use super::record::{PhaseEntry, PhaseOutcome, RunRecord, RunStatus};

// ───────────────────────────────────────────────────────────────
// Pre-run sensor check
// ───────────────────────────────────────────────────────────────

/// Raw level switch readings taken before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreflightReport {
    pub water_level: bool,
    pub disinfectant_level: bool,
    /// The operator confirmed the tanks are ready.
    pub confirmed: bool,
}

fn level_name(high: bool) -> &'static str {
    if high { "FULL" } else { "EMPTY" }
}

// ───────────────────────────────────────────────────────────────
// WasherService
// ───────────────────────────────────────────────────────────────

pub struct WasherService<IO, C> {
    runner: PhaseRunner<IO, C>,
}

impl<IO: DigitalIo, C: Clock + Clone> WasherService<IO, C> {
    /// Build the service.  Pins are not touched until the first run or
    /// preflight.
    pub fn new(io: IO, clock: C, config: &WasherConfig) -> Self {
        Self {
            runner: PhaseRunner::new(io, clock, CancelFlag::new(), config),
        }
    }

    /// Handle the interactive surface raises to stop a run.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.runner.cancel_flag().clone()
    }

    pub fn runner(&self) -> &PhaseRunner<IO, C> {
        &self.runner
    }

    pub fn actuators(&self) -> &ActuatorSet<IO> {
        self.runner.actuators()
    }

    // ── Preflight ─────────────────────────────────────────────

    /// Read both level switches and ask the operator to confirm the tanks
    /// are empty.
    pub fn preflight(&mut self, gate: &mut dyn OperatorGate) -> Result<PreflightReport, HardwareFault> {
        let actuators = self.runner.actuators_mut();
        actuators.initialize()?;
        let io = actuators.io_mut();
        let water_level = io.read_pin(PinRole::WaterLevelSensor)?;
        let disinfectant_level = io.read_pin(PinRole::DisinfectLevelSensor)?;
        info!(
            "preflight: water {}, disinfectant {}",
            level_name(water_level),
            level_name(disinfectant_level)
        );

        let prompt = format!(
            "Sensor self-test: water tank {}, disinfectant tank {}. \
             Make sure the wash basin is empty, then confirm to start.",
            level_name(water_level),
            level_name(disinfectant_level)
        );
        let confirmed = gate.confirm(&prompt) == Confirmation::Proceed;
        if !confirmed {
            warn!("preflight: not confirmed by operator");
        }
        Ok(PreflightReport {
            water_level,
            disinfectant_level,
            confirmed,
        })
    }

    // ── Run ───────────────────────────────────────────────────

    /// Execute the selected phases in canonical order.
    ///
    /// Returns `Err` only for an invalid request, in which case no pin has
    /// been touched.  Every other outcome, including hardware faults, is
    /// described by the returned record.  On return all valves and pumps are
    /// off and the status LED is dark.
    pub fn run(
        &mut self,
        request: &RunRequest,
        ports: &mut RunPorts<'_>,
    ) -> Result<RunRecord, ValidationError> {
        let selection = request.validate()?;
        let started = self.runner.clock().now();
        let mut record = RunRecord::begin(&request.operator_id, &request.scope_id);
        info!(
            "run: operator {} scope {}: {} phase(s)",
            record.operator_id,
            record.scope_id,
            selection.len()
        );

        if let Err(fault) = self.execute(&selection, &mut record, ports) {
            error!("run: hardware fault: {fault}");
            record.status = RunStatus::SystemError;
            record.error = Some(fault.to_string());
        }

        // Shutdown path, whatever ended the loop.
        let actuators = self.runner.actuators_mut();
        actuators.shutdown_all();
        if let Err(e) = actuators.signal_status(false) {
            warn!("run: status LED off: {e}");
        }
        if record.status.is_failure() {
            if let Err(e) = actuators.signal_error(true) {
                warn!("run: error LED: {e}");
            }
        }
        ports.events.emit(&WashEvent::RunFinished(record.status));

        let pattern = match record.status {
            RunStatus::Success => Some(BuzzerPattern::Completion),
            status if status.is_failure() => Some(BuzzerPattern::Error),
            _ => None,
        };
        if let Some(pattern) = pattern {
            if let Err(e) = self.runner.sound_pattern(pattern) {
                warn!("run: buzzer: {e}");
            }
        }

        let elapsed = self.runner.clock().now().saturating_sub(started);
        record.finish(elapsed.as_secs());
        info!("run: finished {} after {}s", record.status, record.total_duration_secs);

        if record.status == RunStatus::Success {
            ports.reports.offer(&record);
        }
        if let Err(e) = ports.records.store(&record) {
            error!("run: record not saved: {e}");
        }

        self.runner.cancel_flag().reset();
        Ok(record)
    }

    fn execute(
        &mut self,
        selection: &Selection,
        record: &mut RunRecord,
        ports: &mut RunPorts<'_>,
    ) -> Result<(), HardwareFault> {
        let actuators = self.runner.actuators_mut();
        actuators.initialize()?;
        actuators.signal_error(false)?;
        actuators.signal_status(true)?;
        ports.events.emit(&WashEvent::RunStarted);

        for setting in selection.iter() {
            let phase = setting.phase;
            if self.runner.cancel_flag().is_requested() {
                info!("run: stop requested before {phase}");
                record.status = RunStatus::StoppedByUser;
                return Ok(());
            }

            ports.events.emit(&WashEvent::PhaseStarted(phase));
            let mut entry = PhaseEntry {
                name: phase,
                duration: setting.duration_minutes,
                outcome: PhaseOutcome::Error,
                warnings: 0,
            };

            let report = match self.runner.run_phase(setting, ports.events, ports.gate) {
                Ok(report) => report,
                Err(fault) => {
                    record.push_phase(entry);
                    ports.events.emit(&WashEvent::PhaseFinished {
                        phase,
                        outcome: PhaseOutcome::Error,
                    });
                    return Err(fault);
                }
            };

            entry.warnings = report.warnings;
            entry.outcome = match report.result {
                PhaseResult::Completed => PhaseOutcome::Success,
                PhaseResult::Aborted => PhaseOutcome::Aborted,
                PhaseResult::Failed(_) => PhaseOutcome::Error,
            };
            record.push_phase(entry);
            ports.events.emit(&WashEvent::PhaseFinished {
                phase,
                outcome: entry.outcome,
            });

            match report.result {
                PhaseResult::Completed => {}
                PhaseResult::Aborted => {
                    record.status = RunStatus::StoppedByUser;
                    return Ok(());
                }
                PhaseResult::Failed(reason) => {
                    record.status = RunStatus::Error;
                    record.error = Some(format!("{phase}: {reason}"));
                    return Ok(());
                }
            }
        }

        if self.runner.cancel_flag().is_requested() {
            record.status = RunStatus::StoppedByUser;
        } else {
            record.status = RunStatus::Success;
        }
        Ok(())
    }

    /// Switch everything off and release the pins.  Call once at exit.
    pub fn release(&mut self) {
        self.runner.actuators_mut().release();
    }
}
