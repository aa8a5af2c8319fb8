//! Simulated GPIO backend for machines without washer hardware.
//!
//! Behaves like a plumbed tank rather than returning noise: a tank's level
//! switch reads HIGH once its inlet valve and pump have both been energised
//! for `fill_reads` level samples, and drops back to LOW the moment its
//! drain path opens.  Levels can also be pinned with [`SimulatedIo::force_level`]
//! to rehearse a stuck sensor.

use log::debug;

use crate::app::ports::DigitalIo;
use crate::error::HardwareFault;
use crate::pins::PinRole;

/// Samples it takes to fill a tank at the default 100 ms poll (≈3 s).
pub const DEFAULT_FILL_READS: u32 = 30;

#[derive(Debug, Clone, Copy, Default)]
struct Tank {
    fill_progress: u32,
    forced: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SimulatedIo {
    outputs: [bool; PinRole::COUNT],
    water: Tank,
    disinfectant: Tank,
    fill_reads: u32,
}

impl Default for SimulatedIo {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedIo {
    pub fn new() -> Self {
        Self::with_fill_reads(DEFAULT_FILL_READS)
    }

    pub fn with_fill_reads(fill_reads: u32) -> Self {
        Self {
            outputs: [false; PinRole::COUNT],
            water: Tank::default(),
            disinfectant: Tank::default(),
            fill_reads: fill_reads.max(1),
        }
    }

    /// Pin a level sensor to a fixed value (`None` restores the model).
    pub fn force_level(&mut self, sensor: PinRole, level: Option<bool>) {
        if let Some(tank) = self.tank_mut(sensor) {
            tank.forced = level;
        }
    }

    /// Current level of an output pin.
    pub fn output(&self, role: PinRole) -> bool {
        self.outputs[role.index()]
    }

    fn tank_mut(&mut self, sensor: PinRole) -> Option<&mut Tank> {
        match sensor {
            PinRole::WaterLevelSensor => Some(&mut self.water),
            PinRole::DisinfectLevelSensor => Some(&mut self.disinfectant),
            _ => None,
        }
    }
}

impl DigitalIo for SimulatedIo {
    fn initialize_all_pins(&mut self) -> Result<(), HardwareFault> {
        self.outputs = [false; PinRole::COUNT];
        debug!("sim: all outputs LOW");
        Ok(())
    }

    fn set_pin(&mut self, role: PinRole, high: bool) -> Result<(), HardwareFault> {
        if role.is_input() {
            return Err(HardwareFault::write(role));
        }
        if self.outputs[role.index()] != high {
            debug!("sim: {role} -> {}", if high { "HIGH" } else { "LOW" });
        }
        self.outputs[role.index()] = high;

        if high {
            match role {
                PinRole::DrainValve => self.water.fill_progress = 0,
                PinRole::DisinfectDrain => self.disinfectant.fill_progress = 0,
                _ => {}
            }
        }
        Ok(())
    }

    fn read_pin(&mut self, role: PinRole) -> Result<bool, HardwareFault> {
        let (inlet, pump) = match role {
            PinRole::WaterLevelSensor => (PinRole::InletValve, PinRole::WaterPump),
            PinRole::DisinfectLevelSensor => (PinRole::DisinfectInlet, PinRole::DisinfectPump),
            _ => return Err(HardwareFault::read(role)),
        };
        let filling = self.output(inlet) && self.output(pump);
        let fill_reads = self.fill_reads;
        let Some(tank) = self.tank_mut(role) else {
            return Err(HardwareFault::read(role));
        };

        if filling {
            tank.fill_progress = tank.fill_progress.saturating_add(1);
        }
        Ok(tank.forced.unwrap_or(tank.fill_progress >= fill_reads))
    }

    fn cleanup(&mut self) {
        self.outputs = [false; PinRole::COUNT];
        debug!("sim: cleanup");
    }
}
