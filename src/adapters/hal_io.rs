//! GPIO backend over `embedded-hal` 1.0 digital pin traits.
//!
//! Any HAL whose pins implement [`OutputPin`] / [`InputPin`] can drive the
//! washer.  With the `rpi` feature, [`open_rppal`] builds one from the
//! Raspberry Pi GPIO using the configured [`PinMap`].

use embedded_hal::digital::{Error as _, InputPin, OutputPin, PinState};
use log::{error, warn};

use crate::app::ports::DigitalIo;
use crate::error::{FaultKind, HardwareFault};
use crate::pins::PinRole;

pub struct HalIo<O, I> {
    outputs: Vec<(PinRole, O)>,
    inputs: Vec<(PinRole, I)>,
}

impl<O, I> Default for HalIo<O, I> {
    fn default() -> Self {
        Self {
            outputs: Vec::new(),
            inputs: Vec::new(),
        }
    }
}

impl<O: OutputPin, I: InputPin> HalIo<O, I> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_output(mut self, role: PinRole, pin: O) -> Self {
        self.outputs.retain(|(r, _)| *r != role);
        self.outputs.push((role, pin));
        self
    }

    #[must_use]
    pub fn with_input(mut self, role: PinRole, pin: I) -> Self {
        self.inputs.retain(|(r, _)| *r != role);
        self.inputs.push((role, pin));
        self
    }

    fn output_mut(&mut self, role: PinRole) -> Option<&mut O> {
        self.outputs
            .iter_mut()
            .find_map(|(r, pin)| (*r == role).then_some(pin))
    }

    fn input_mut(&mut self, role: PinRole) -> Option<&mut I> {
        self.inputs
            .iter_mut()
            .find_map(|(r, pin)| (*r == role).then_some(pin))
    }
}

impl<O: OutputPin, I: InputPin> DigitalIo for HalIo<O, I> {
    fn initialize_all_pins(&mut self) -> Result<(), HardwareFault> {
        let init_fault = |role| HardwareFault {
            role: Some(role),
            kind: FaultKind::Init,
        };
        for role in PinRole::OUTPUTS {
            let pin = self.output_mut(role).ok_or(init_fault(role))?;
            pin.set_low().map_err(|e| {
                error!("hal: {role} init: {:?}", e.kind());
                init_fault(role)
            })?;
        }
        for role in PinRole::INPUTS {
            if self.input_mut(role).is_none() {
                return Err(init_fault(role));
            }
        }
        Ok(())
    }

    fn set_pin(&mut self, role: PinRole, high: bool) -> Result<(), HardwareFault> {
        let pin = self
            .output_mut(role)
            .ok_or(HardwareFault::write(role))?;
        pin.set_state(PinState::from(high)).map_err(|e| {
            error!("hal: {role} write: {:?}", e.kind());
            HardwareFault::write(role)
        })
    }

    fn read_pin(&mut self, role: PinRole) -> Result<bool, HardwareFault> {
        let pin = self.input_mut(role).ok_or(HardwareFault::read(role))?;
        pin.is_high().map_err(|e| {
            error!("hal: {role} read: {:?}", e.kind());
            HardwareFault::read(role)
        })
    }

    fn cleanup(&mut self) {
        for (role, pin) in &mut self.outputs {
            if pin.set_low().is_err() {
                warn!("hal: {role} could not be released low");
            }
        }
    }
}

/// Raspberry Pi backend.
#[cfg(feature = "rpi")]
pub type RppalIo = HalIo<rppal::gpio::OutputPin, rppal::gpio::InputPin>;

/// Claim every mapped BCM pin: outputs start LOW, level inputs get a pull-down.
#[cfg(feature = "rpi")]
pub fn open_rppal(pins: &crate::pins::PinMap) -> Result<RppalIo, rppal::gpio::Error> {
    let gpio = rppal::gpio::Gpio::new()?;
    let mut io = HalIo::new();
    for role in PinRole::OUTPUTS {
        io = io.with_output(role, gpio.get(pins.bcm(role))?.into_output_low());
    }
    for role in PinRole::INPUTS {
        io = io.with_input(role, gpio.get(pins.bcm(role))?.into_input_pulldown());
    }
    Ok(io)
}
