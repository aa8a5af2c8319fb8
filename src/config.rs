//! System configuration parameters
//!
//! All tunable parameters for the washer controller.  Loaded once at
//! startup from a JSON file (or defaults) and never changed during a run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins::PinMap;

/// Level sensor debounce and fill-wait parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelSensorConfig {
    /// Delay between sensor polls (milliseconds).
    pub check_interval_ms: u32,
    /// Consecutive identical raw reads required before a transition is trusted.
    pub min_stable_reads: u8,
    /// How long a fill may wait for the tank to report full (seconds).
    pub fill_timeout_secs: u32,
}

impl Default for LevelSensorConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 100,
            min_stable_reads: 5,
            fill_timeout_secs: 90,
        }
    }
}

/// Fixed windows used by the drain and return steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessTiming {
    /// How long the drain / return path is held open (seconds).
    pub drain_window_secs: u32,
    /// Cancellation check granularity while draining (milliseconds).
    pub drain_tick_ms: u32,
}

impl Default for ProcessTiming {
    fn default() -> Self {
        Self {
            drain_window_secs: 60,
            drain_tick_ms: 500,
        }
    }
}

/// What a fill does when its level sensor never reports full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillTimeoutPolicy {
    /// Log a warning and carry on with the phase.
    #[default]
    Warn,
    /// Fail the phase (and therefore the run).
    Fail,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WasherConfig {
    pub pins: PinMap,
    pub level_sensor: LevelSensorConfig,
    pub timing: ProcessTiming,
    pub fill_timeout_policy: FillTimeoutPolicy,
    /// Directory holding `wash_history.json` and the per-run text logs.
    pub history_dir: PathBuf,
}

impl Default for WasherConfig {
    fn default() -> Self {
        Self {
            pins: PinMap::default(),
            level_sensor: LevelSensorConfig::default(),
            timing: ProcessTiming::default(),
            fill_timeout_policy: FillTimeoutPolicy::Warn,
            history_dir: PathBuf::from("logs"),
        }
    }
}

impl WasherConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON document.  Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range values.  Nothing is clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sensor = &self.level_sensor;
        if !(10..=1000).contains(&sensor.check_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "level_sensor.check_interval_ms must be within 10..=1000",
            ));
        }
        if sensor.min_stable_reads == 0 {
            return Err(ConfigError::ValidationFailed(
                "level_sensor.min_stable_reads must be at least 1",
            ));
        }
        if sensor.fill_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "level_sensor.fill_timeout_secs must be positive",
            ));
        }
        if self.timing.drain_window_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "timing.drain_window_secs must be positive",
            ));
        }
        if !(10..=1000).contains(&self.timing.drain_tick_ms) {
            return Err(ConfigError::ValidationFailed(
                "timing.drain_tick_ms must be within 10..=1000",
            ));
        }
        if self.pins.find_duplicate().is_some() {
            return Err(ConfigError::ValidationFailed(
                "pins: two roles share one BCM pin",
            ));
        }
        Ok(())
    }
}
