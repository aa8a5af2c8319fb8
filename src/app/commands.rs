//! Inbound run requests.
//!
//! The interactive surface collects operator, scope and phase selection
//! (typed, scanned or looked up elsewhere) and hands a [`RunRequest`] to the
//! [`WasherService`](super::service::WasherService).  Validation happens
//! here, before any pin is touched.

use crate::error::ValidationError;
use crate::phase::{Phase, PhaseSetting};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunRequest {
    pub operator_id: String,
    pub scope_id: String,
    /// Selected phases, in any order.
    pub phases: Vec<PhaseSetting>,
}

impl RunRequest {
    pub fn new(operator_id: impl Into<String>, scope_id: impl Into<String>) -> Self {
        Self {
            operator_id: operator_id.into(),
            scope_id: scope_id.into(),
            phases: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_phase(mut self, phase: Phase, duration_minutes: u8) -> Self {
        self.phases.push(PhaseSetting::new(phase, duration_minutes));
        self
    }

    /// Check the request and put the selection in canonical order.
    pub fn validate(&self) -> Result<Selection, ValidationError> {
        if self.operator_id.trim().is_empty() {
            return Err(ValidationError::MissingOperatorId);
        }
        if self.scope_id.trim().is_empty() {
            return Err(ValidationError::MissingScopeId);
        }
        if self.phases.is_empty() {
            return Err(ValidationError::NoPhaseSelected);
        }

        let mut slots = [None; Phase::COUNT];
        for setting in &self.phases {
            if !setting.duration_is_valid() {
                return Err(ValidationError::InvalidDuration {
                    phase: setting.phase,
                    minutes: setting.duration_minutes,
                });
            }
            let slot = &mut slots[setting.phase.index()];
            if slot.is_some() {
                return Err(ValidationError::DuplicatePhase(setting.phase));
            }
            *slot = Some(*setting);
        }
        Ok(Selection(slots))
    }
}

/// A validated phase selection, one slot per phase in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection([Option<PhaseSetting>; Phase::COUNT]);

impl Selection {
    /// Selected phases in execution order.
    pub fn iter(&self) -> impl Iterator<Item = PhaseSetting> + '_ {
        self.0.iter().flatten().copied()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
