//! Debounced float-switch level sensors for the water and disinfectant tanks.
//!
//! A raw GPIO sample is noisy while the tank is filling (splashing, switch
//! bounce).  The sensor only trusts a transition after `min_stable_reads`
//! consecutive identical raw samples, polled every `check_interval`.  The
//! reported stable level may therefore lag the raw input by up to
//! `min_stable_reads × check_interval`.

use std::time::Duration;

use crate::app::cancel::CancelFlag;
use crate::app::ports::{Clock, DigitalIo};
use crate::config::LevelSensorConfig;
use crate::error::HardwareFault;
use crate::pins::PinRole;

/// Debounce bookkeeping, mutated only by [`LevelSensor::read_stable_level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelSensorState {
    /// Trusted (debounced) level.
    pub last_stable_state: bool,
    /// Length of the current run of identical raw samples.
    pub stable_count: u8,
    /// The raw sample that run consists of.
    pub last_raw: bool,
    /// Clock reading at the most recent sample.
    pub last_read_time: Option<Duration>,
}

/// How a [`LevelSensor::wait_for_level`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelWait {
    /// The stable level matched the target before the deadline.
    Reached,
    /// The deadline passed first.
    TimedOut,
    /// A stop request was observed; the wait was abandoned.
    Cancelled,
}

pub struct LevelSensor<C> {
    role: PinRole,
    clock: C,
    check_interval: Duration,
    min_stable_reads: u8,
    state: LevelSensorState,
}

impl<C: Clock> LevelSensor<C> {
    pub fn new(role: PinRole, clock: C, config: &LevelSensorConfig) -> Self {
        debug_assert!(role.is_input(), "{role} is not a sensor input");
        Self {
            role,
            clock,
            check_interval: Duration::from_millis(u64::from(config.check_interval_ms)),
            min_stable_reads: config.min_stable_reads.max(1),
            state: LevelSensorState::default(),
        }
    }

    pub fn role(&self) -> PinRole {
        self.role
    }

    pub fn state(&self) -> &LevelSensorState {
        &self.state
    }

    /// Last trusted level without sampling the pin.
    pub fn stable_level(&self) -> bool {
        self.state.last_stable_state
    }

    /// Forget the debounce history and assume an empty tank.
    ///
    /// Called before each fill: nobody polls the sensor while a tank drains,
    /// so the last stable level is stale by then.
    pub fn reset(&mut self) {
        self.state = LevelSensorState::default();
    }

    /// Take one raw sample and return the debounced level.
    pub fn read_stable_level<IO: DigitalIo + ?Sized>(
        &mut self,
        io: &mut IO,
    ) -> Result<bool, HardwareFault> {
        let raw = io.read_pin(self.role)?;
        let s = &mut self.state;

        if raw == s.last_raw {
            s.stable_count = s.stable_count.saturating_add(1);
        } else {
            s.last_raw = raw;
            s.stable_count = 1;
        }

        if s.stable_count >= self.min_stable_reads && s.last_stable_state != raw {
            log::debug!("{}: level now {}", self.role, if raw { "HIGH" } else { "LOW" });
            s.last_stable_state = raw;
        }

        s.last_read_time = Some(self.clock.now());
        Ok(s.last_stable_state)
    }

    /// Poll until the stable level equals `target`, the timeout expires, or
    /// `cancel` is raised.
    ///
    /// `on_tick` receives the remaining whole seconds once per poll, including
    /// the poll that reaches the target.  The call returns no later than
    /// `timeout + check_interval` after it started.
    pub fn wait_for_level<IO: DigitalIo + ?Sized>(
        &mut self,
        io: &mut IO,
        cancel: &CancelFlag,
        target: bool,
        timeout: Duration,
        mut on_tick: impl FnMut(u32),
    ) -> Result<LevelWait, HardwareFault> {
        let start = self.clock.now();

        loop {
            if cancel.is_requested() {
                return Ok(LevelWait::Cancelled);
            }

            let elapsed = self.clock.now().saturating_sub(start);
            if elapsed >= timeout {
                return Ok(LevelWait::TimedOut);
            }

            let level = self.read_stable_level(io)?;
            on_tick((timeout - elapsed).as_secs() as u32);
            if level == target {
                return Ok(LevelWait::Reached);
            }
            self.clock.sleep(self.check_interval);
        }
    }
}
