//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ WasherService (domain)
//! ```
//!
//! Driven adapters (pins, clocks, displays, operator prompts, history
//! storage) implement these traits.  The [`WasherService`](super::service::WasherService)
//! consumes them via generics or trait objects, so the domain core never
//! touches hardware directly and behaves identically on the simulator.

use std::time::Duration;

use crate::error::{HardwareFault, StorageError};
use crate::pins::PinRole;

use super::events::WashEvent;
use super::record::RunRecord;

// ───────────────────────────────────────────────────────────────
// Digital I/O port (driven adapter: domain ↔ GPIO)
// ───────────────────────────────────────────────────────────────

/// Raw pin access by role.  The only way the controller reaches hardware.
pub trait DigitalIo {
    /// Configure every output LOW and every input with its pull resistor.
    fn initialize_all_pins(&mut self) -> Result<(), HardwareFault>;

    /// Drive an output role high or low.
    fn set_pin(&mut self, role: PinRole, high: bool) -> Result<(), HardwareFault>;

    /// Sample an input role.
    fn read_pin(&mut self, role: PinRole) -> Result<bool, HardwareFault>;

    /// Release the pins.  Called once at process exit.
    fn cleanup(&mut self);
}

impl<T: DigitalIo + ?Sized> DigitalIo for Box<T> {
    fn initialize_all_pins(&mut self) -> Result<(), HardwareFault> {
        (**self).initialize_all_pins()
    }

    fn set_pin(&mut self, role: PinRole, high: bool) -> Result<(), HardwareFault> {
        (**self).set_pin(role, high)
    }

    fn read_pin(&mut self, role: PinRole) -> Result<bool, HardwareFault> {
        (**self).read_pin(role)
    }

    fn cleanup(&mut self) {
        (**self).cleanup();
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time plus the sleep primitive every wait is built on.
pub trait Clock {
    /// Time since an arbitrary fixed origin.  Never goes backwards.
    fn now(&self) -> Duration;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → display / logging)
// ───────────────────────────────────────────────────────────────

/// The controller publishes progress through this port.  Called
/// synchronously on the worker thread, at most once per tick quantum;
/// implementations must not block.
pub trait EventSink {
    fn emit(&mut self, event: &WashEvent);
}

// ───────────────────────────────────────────────────────────────
// Operator acknowledge gate
// ───────────────────────────────────────────────────────────────

/// Answer to an operator prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Acknowledged; carry on.
    Proceed,
    /// The operator explicitly refused.
    Declined,
    /// The prompt was abandoned (stop pressed, window closed).
    Cancelled,
}

/// Blocking human-in-the-loop prompt.
pub trait OperatorGate {
    fn confirm(&mut self, message: &str) -> Confirmation;
}

// ───────────────────────────────────────────────────────────────
// Run-record and report ports
// ───────────────────────────────────────────────────────────────

/// Persists finished run records (history database, text export).
pub trait RecordSink {
    fn store(&mut self, record: &RunRecord) -> Result<(), StorageError>;
}

/// Receives the record of a fully successful run, e.g. to print a report.
pub trait ReportSink {
    fn offer(&mut self, record: &RunRecord);
}

/// The set of collaborators a single run talks to.
pub struct RunPorts<'a> {
    pub events: &'a mut dyn EventSink,
    pub gate: &'a mut dyn OperatorGate,
    pub records: &'a mut dyn RecordSink,
    pub reports: &'a mut dyn ReportSink,
}
