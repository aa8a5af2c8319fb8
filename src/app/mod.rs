//! Application core: the wash process as pure domain logic.
//!
//! Run validation, phase sequencing, run records and the stop flag live
//! here.  All interaction with pins, clocks, displays and storage happens
//! through the **port traits** in [`ports`], keeping this layer fully
//! testable on the simulator.

pub mod cancel;
pub mod commands;
pub mod events;
pub mod ports;
pub mod record;
pub mod service;
pub mod worker;
