//! Sensor drivers.
//!
//! The washer has two digital float switches, one per tank, both read
//! through the debounced [`level::LevelSensor`].

pub mod level;
