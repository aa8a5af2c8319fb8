//! Valves, pumps, LEDs and buzzer behind one role-addressed handle.
//!
//! ## Safety contract
//!
//! [`ActuatorSet::shutdown_all`] de-energises every valve and pump.  It is
//! idempotent, callable from any state, never returns an error (a failing
//! pin is logged and the remaining pins are still driven low), and is a
//! no-op before [`ActuatorSet::initialize`] has succeeded.
//!
//! This driver is a dumb actuator: sequencing rules live in the phase
//! runner.

use log::{debug, error, warn};

use crate::app::ports::{Clock, DigitalIo};
use crate::error::HardwareFault;
use crate::pins::PinRole;

use super::signals::BuzzerPattern;

pub struct ActuatorSet<IO> {
    io: IO,
    initialized: bool,
    /// Last commanded level per role.
    commanded: [bool; PinRole::COUNT],
}

impl<IO: DigitalIo> ActuatorSet<IO> {
    pub fn new(io: IO) -> Self {
        Self {
            io,
            initialized: false,
            commanded: [false; PinRole::COUNT],
        }
    }

    /// Configure all pins.  Safe to call again; later calls are no-ops.
    pub fn initialize(&mut self) -> Result<(), HardwareFault> {
        if self.initialized {
            return Ok(());
        }
        self.io.initialize_all_pins()?;
        self.commanded = [false; PinRole::COUNT];
        self.initialized = true;
        debug!("actuators: pins initialised");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Drive one output role.
    pub fn set(&mut self, role: PinRole, on: bool) -> Result<(), HardwareFault> {
        if !self.initialized {
            return Err(HardwareFault::not_initialized(role));
        }
        self.io.set_pin(role, on)?;
        self.commanded[role.index()] = on;
        Ok(())
    }

    /// Last level this set commanded on `role`.
    pub fn is_on(&self, role: PinRole) -> bool {
        self.commanded[role.index()]
    }

    /// True if any valve or pump is commanded on.
    pub fn any_power_on(&self) -> bool {
        PinRole::POWER.iter().any(|r| self.is_on(*r))
    }

    /// Turn every valve and pump off.
    pub fn shutdown_all(&mut self) {
        if !self.initialized {
            return;
        }
        for role in PinRole::POWER {
            match self.io.set_pin(role, false) {
                Ok(()) => self.commanded[role.index()] = false,
                Err(e) => error!("shutdown: {e}"),
            }
        }
    }

    pub fn signal_status(&mut self, on: bool) -> Result<(), HardwareFault> {
        self.set(PinRole::StatusLed, on)
    }

    pub fn signal_error(&mut self, on: bool) -> Result<(), HardwareFault> {
        self.set(PinRole::ErrorLed, on)
    }

    /// Sound a canned pattern.  Blocks for the pattern's full duration.
    pub fn sound_pattern(
        &mut self,
        pattern: BuzzerPattern,
        clock: &impl Clock,
    ) -> Result<(), HardwareFault> {
        let result = pattern.pulses().iter().try_for_each(|pulse| {
            self.set(PinRole::Buzzer, true)?;
            clock.sleep(std::time::Duration::from_millis(u64::from(pulse.on_ms)));
            self.set(PinRole::Buzzer, false)?;
            clock.sleep(std::time::Duration::from_millis(u64::from(pulse.off_ms)));
            Ok(())
        });
        if result.is_err() && self.set(PinRole::Buzzer, false).is_err() {
            warn!("buzzer could not be silenced");
        }
        result
    }

    /// Borrow the underlying pins, e.g. for sensor reads.
    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    /// Switch everything off and release the pins.
    pub fn release(&mut self) {
        self.shutdown_all();
        if self.initialized {
            for role in [PinRole::StatusLed, PinRole::ErrorLed, PinRole::Buzzer] {
                if let Err(e) = self.set(role, false) {
                    warn!("release: {e}");
                }
            }
            self.io.cleanup();
            self.initialized = false;
        }
    }
}
