//! The structured record of one process execution.
//!
//! Created when a run starts, appended to as each phase finishes, and
//! handed to the [`RecordSink`](super::ports::RecordSink) once finalised.
//! The JSON shape follows the washer's history database.

use core::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::phase::Phase;

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Error,
    StoppedByUser,
    SystemError,
}

impl RunStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::StoppedByUser => "STOPPED_BY_USER",
            Self::SystemError => "SYSTEM_ERROR",
        }
    }

    /// Failures that get the error LED and the error buzzer.
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Error | Self::SystemError)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseOutcome {
    Success,
    Error,
    /// Interrupted by a stop request after the phase had started.
    Aborted,
}

impl fmt::Display for PhaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::Error => f.write_str("ERROR"),
            Self::Aborted => f.write_str("ABORTED"),
        }
    }
}

fn is_zero(n: &u8) -> bool {
    *n == 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseEntry {
    pub name: Phase,
    /// Configured duration in minutes.
    pub duration: u8,
    #[serde(rename = "status")]
    pub outcome: PhaseOutcome,
    /// Fill steps that timed out on their level sensor.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub warnings: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub timestamp_start: DateTime<Local>,
    #[serde(default)]
    pub timestamp_end: Option<DateTime<Local>>,
    #[serde(default)]
    pub total_duration_secs: u64,
    pub operator_id: String,
    pub scope_id: String,
    pub phases: heapless::Vec<PhaseEntry, { Phase::COUNT }>,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunRecord {
    /// Open a record for a run that is starting now.
    pub fn begin(operator_id: &str, scope_id: &str) -> Self {
        Self {
            timestamp_start: Local::now(),
            timestamp_end: None,
            total_duration_secs: 0,
            operator_id: operator_id.to_owned(),
            scope_id: scope_id.to_owned(),
            phases: heapless::Vec::new(),
            status: RunStatus::Success,
            error: None,
        }
    }

    /// Append a phase entry in execution order.
    pub fn push_phase(&mut self, entry: PhaseEntry) {
        if self.phases.push(entry).is_err() {
            // Unreachable with validated requests: one entry per distinct phase.
            log::error!("run record full, dropping phase entry");
        }
    }

    /// Close the record.  `elapsed` is measured on the controller's clock.
    pub fn finish(&mut self, elapsed_secs: u64) {
        self.timestamp_end = Some(Local::now());
        self.total_duration_secs = elapsed_secs;
    }

    pub fn is_finished(&self) -> bool {
        self.timestamp_end.is_some()
    }

    /// Outcome recorded for `phase`, if it ran.
    pub fn outcome_of(&self, phase: Phase) -> Option<PhaseOutcome> {
        self.phases
            .iter()
            .find(|e| e.name == phase)
            .map(|e| e.outcome)
    }

    /// Human-readable rendering for text export and printing.
    pub fn text_report(&self) -> TextReport<'_> {
        TextReport(self)
    }
}

/// Plain-text washer log for one run.
pub struct TextReport<'a>(&'a RunRecord);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const STAMP: &str = "%Y-%m-%d %H:%M:%S";
        let r = self.0;
        writeln!(f, "=============== ENDOSCOPE WASHER LOG ===============")?;
        writeln!(f, "Date: {}", r.timestamp_start.format("%Y-%m-%d"))?;
        writeln!(f, "Operator ID: {}", r.operator_id)?;
        writeln!(f, "Scope ID: {}", r.scope_id)?;
        writeln!(f, "Started: {}", r.timestamp_start.format(STAMP))?;
        match r.timestamp_end {
            Some(end) => writeln!(f, "Finished: {}", end.format(STAMP))?,
            None => writeln!(f, "Finished: -")?,
        }
        let total = r.total_duration_secs;
        writeln!(
            f,
            "Total duration: {}:{:02}:{:02}",
            total / 3600,
            (total / 60) % 60,
            total % 60
        )?;
        writeln!(f, "Status: {}", r.status)?;
        if let Some(error) = &r.error {
            writeln!(f, "Error: {error}")?;
        }
        writeln!(f, "Phases:")?;
        for entry in &r.phases {
            write!(f, "  - {}: {} ({} min)", entry.name, entry.outcome, entry.duration)?;
            if entry.warnings > 0 {
                write!(f, " [{} level warning(s)]", entry.warnings)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "{}", "=".repeat(50))
    }
}
