//! Endoscope washer controller library.
//!
//! Sequences the wash phases over a pluggable GPIO backend.  The host
//! binary and the integration tests drive it through the same
//! [`app::service::WasherService`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod phase;
pub mod pins;
pub mod sensors;

pub use error::{Error, Result};
