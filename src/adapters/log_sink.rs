//! Log-based adapters.
//!
//! [`LogEventSink`] writes every progress event to the `log` facade;
//! [`LogReportSink`] prints the wash report of a successful run.  A GUI or
//! printer adapter would implement the same traits.

use log::{debug, error, info, warn};

use crate::app::events::WashEvent;
use crate::app::ports::{EventSink, ReportSink};
use crate::app::record::{PhaseOutcome, RunRecord, RunStatus};

/// Adapter that logs every [`WashEvent`].  Countdown ticks go to `debug`
/// so the default log level stays readable.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &WashEvent) {
        let label = event.phase().map_or("-", |p| p.name());
        match event {
            WashEvent::FillCountdown { .. }
            | WashEvent::TreatCountdown { .. }
            | WashEvent::DrainCountdown { .. } => debug!("TICK  | {label} | {event}"),
            WashEvent::LevelTimeout { .. } => warn!("LEVEL | {label} | {event}"),
            WashEvent::PhaseFinished {
                outcome: PhaseOutcome::Error,
                ..
            } => error!("PHASE | {label} | {event}"),
            WashEvent::RunFinished(status) if status.is_failure() => {
                error!("RUN   | {event} ({status})");
            }
            WashEvent::RunStarted | WashEvent::RunFinished(_) => info!("RUN   | {event}"),
            _ => info!("PHASE | {label} | {event}"),
        }
    }
}

/// Prints the text report of each successful run to the log.
#[derive(Debug, Default)]
pub struct LogReportSink;

impl ReportSink for LogReportSink {
    fn offer(&mut self, record: &RunRecord) {
        debug_assert_eq!(record.status, RunStatus::Success);
        info!("wash report:\n{}", record.text_report());
    }
}
