//! Process-wide stop request.
//!
//! A single shared boolean: the interactive surface raises it, the worker
//! polls it at every suspension point.  Only the orchestrator clears it,
//! once a run has fully completed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    requested: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the running process to stop at its next checkpoint.
    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    pub(crate) fn reset(&self) {
        self.requested.store(false, Ordering::Release);
    }
}
