//! Dedicated run worker.
//!
//! A run blocks for as long as the wash takes, so it executes on its own
//! thread.  The interactive side keeps a [`RunHandle`]: it can raise the
//! stop flag and wait for the service to come back.  The service moves into
//! the worker and out again on [`RunHandle::join`], so two runs can never
//! share the pins.

use std::thread::{self, JoinHandle};

use log::{debug, error};

use crate::error::{Error, ValidationError};

use super::cancel::CancelFlag;
use super::commands::RunRequest;
use super::ports::{Clock, DigitalIo, EventSink, OperatorGate, RecordSink, ReportSink, RunPorts};
use super::record::RunRecord;
use super::service::WasherService;

/// Owned, thread-safe counterparts of [`RunPorts`].
pub struct WorkerPorts {
    pub events: Box<dyn EventSink + Send>,
    pub gate: Box<dyn OperatorGate + Send>,
    pub records: Box<dyn RecordSink + Send>,
    pub reports: Box<dyn ReportSink + Send>,
}

pub type RunOutcome = Result<RunRecord, ValidationError>;

pub struct RunHandle<IO, C> {
    cancel: CancelFlag,
    thread: JoinHandle<(WasherService<IO, C>, RunOutcome)>,
}

/// Start `request` on a new worker thread.
pub fn spawn_run<IO, C>(
    mut service: WasherService<IO, C>,
    request: RunRequest,
    mut ports: WorkerPorts,
) -> RunHandle<IO, C>
where
    IO: DigitalIo + Send + 'static,
    C: Clock + Clone + Send + 'static,
{
    let cancel = service.cancel_flag();
    let thread = thread::spawn(move || {
        debug!("worker: run started");
        let outcome = service.run(
            &request,
            &mut RunPorts {
                events: &mut *ports.events,
                gate: &mut *ports.gate,
                records: &mut *ports.records,
                reports: &mut *ports.reports,
            },
        );
        debug!("worker: run returned");
        (service, outcome)
    });
    RunHandle { cancel, thread }
}

impl<IO, C> RunHandle<IO, C> {
    /// Ask the run to stop at its next checkpoint.  Returns immediately.
    pub fn stop(&self) {
        self.cancel.request();
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker and take the service back.
    pub fn join(self) -> Result<(WasherService<IO, C>, RunOutcome), Error> {
        self.thread.join().map_err(|_| {
            error!("worker: run thread panicked");
            Error::WorkerPanicked
        })
    }
}
