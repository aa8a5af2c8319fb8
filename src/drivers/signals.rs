//! Canned buzzer patterns.
//!
//! | Pattern    | Shape                                  | Total   |
//! |------------|----------------------------------------|---------|
//! | Error      | 1.0 s on, 0.5 s off, 1.0 s on          | 2.5 s   |
//! | Completion | 3 × (0.3 s on, 0.2 s off)              | 1.5 s   |
//!
//! Patterns are short and bounded; once started they always run to the end.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzerPattern {
    Error,
    Completion,
}

/// One buzzer pulse: on for `on_ms`, then silent for `off_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub on_ms: u16,
    pub off_ms: u16,
}

const ERROR_PULSES: [Pulse; 2] = [
    Pulse {
        on_ms: 1000,
        off_ms: 500,
    },
    Pulse {
        on_ms: 1000,
        off_ms: 0,
    },
];

const COMPLETION_PULSES: [Pulse; 3] = [Pulse {
    on_ms: 300,
    off_ms: 200,
}; 3];

impl BuzzerPattern {
    pub fn pulses(self) -> &'static [Pulse] {
        match self {
            Self::Error => &ERROR_PULSES,
            Self::Completion => &COMPLETION_PULSES,
        }
    }

    /// How long sounding the pattern blocks the caller.
    pub fn total_duration(self) -> Duration {
        let ms: u64 = self
            .pulses()
            .iter()
            .map(|p| u64::from(p.on_ms) + u64::from(p.off_ms))
            .sum();
        Duration::from_millis(ms)
    }
}
