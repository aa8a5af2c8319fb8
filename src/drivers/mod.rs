//! Actuator drivers and signalling patterns.

pub mod actuators;
pub mod signals;
