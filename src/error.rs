//! Unified error types for the washer controller.
//!
//! Every subsystem has its own small error enum; all of them convert into the
//! top-level [`Error`].  [`HardwareFault`] is `Copy` so it can be carried
//! through the phase runner and into the run record without allocation.

use core::fmt;

use crate::phase::Phase;
use crate::pins::PinRole;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A run request was rejected before any hardware was touched.
    Validation(ValidationError),
    /// A pin could not be driven or read.
    Hardware(HardwareFault),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The run history could not be persisted.
    Storage(StorageError),
    /// The run worker thread panicked.
    WorkerPanicked,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::Hardware(e) => write!(f, "hardware: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::WorkerPanicked => write!(f, "run worker panicked"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Caller-side problems with a run request.  Fully recoverable: the caller
/// re-prompts and tries again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    MissingOperatorId,
    MissingScopeId,
    NoPhaseSelected,
    DuplicatePhase(Phase),
    InvalidDuration { phase: Phase, minutes: u8 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOperatorId => write!(f, "operator ID is required"),
            Self::MissingScopeId => write!(f, "scope ID is required"),
            Self::NoPhaseSelected => write!(f, "select at least one phase"),
            Self::DuplicatePhase(phase) => write!(f, "{phase} selected more than once"),
            Self::InvalidDuration { phase, minutes } => write!(
                f,
                "{phase}: {minutes} min is not a valid duration (5-60, step 5)"
            ),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Hardware faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Pin setup failed.
    Init,
    /// Output write failed.
    Write,
    /// Input read failed.
    Read,
    /// An output was driven before the pins were initialised.
    NotInitialized,
}

/// A failing pin operation.  Fatal to the current run; never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareFault {
    pub role: Option<PinRole>,
    pub kind: FaultKind,
}

impl HardwareFault {
    pub const fn write(role: PinRole) -> Self {
        Self {
            role: Some(role),
            kind: FaultKind::Write,
        }
    }

    pub const fn read(role: PinRole) -> Self {
        Self {
            role: Some(role),
            kind: FaultKind::Read,
        }
    }

    pub const fn init() -> Self {
        Self {
            role: None,
            kind: FaultKind::Init,
        }
    }

    pub const fn not_initialized(role: PinRole) -> Self {
        Self {
            role: Some(role),
            kind: FaultKind::NotInitialized,
        }
    }
}

impl fmt::Display for HardwareFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            FaultKind::Init => "pin initialisation failed",
            FaultKind::Write => "pin write failed",
            FaultKind::Read => "pin read failed",
            FaultKind::NotInitialized => "pins not initialised",
        };
        match self.role {
            Some(role) => write!(f, "{what} ({role})"),
            None => f.write_str(what),
        }
    }
}

impl From<HardwareFault> for Error {
    fn from(e: HardwareFault) -> Self {
        Self::Hardware(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file could not be read.
    Io(String),
    /// The config file is not valid JSON for [`WasherConfig`](crate::config::WasherConfig).
    Parse(String),
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Filesystem error.
    Io(String),
    /// Record could not be serialised.
    Serialize(String),
    /// The existing history database could not be parsed.
    Corrupted,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Serialize(msg) => write!(f, "serialisation failed: {msg}"),
            Self::Corrupted => write!(f, "history database corrupted"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
