// CRAMB command set on top of the AMDC link
//
// Radial (3-phase) commands live under "cramb", axial (single-phase) ones
// under "cramb_axial". The firmware takes integer micro/milli units.

use std::io::{Read, Write};
use tracing::{info, warn};

use super::link::{AmdcError, AmdcLink, Result};
use crate::bearing::{BearingModel, CurrentUnits, ForceAllocator};

/// Radial inverters wired to the bearing (1-based, as labelled on the board)
pub const RADIAL_INVERTERS: [u8; 2] = [5, 6];
/// Axial inverters wired to the bearing (1-based)
pub const AXIAL_INVERTERS: [u8; 4] = [1, 2, 3, 4];

fn micro(value: f64) -> i64 {
    (value * 1e6) as i64
}

fn milli(value: f64) -> i64 {
    (value * 1e3) as i64
}

/// High-level controller for the combined radial-axial bearing drive
pub struct Cramb<T: Read + Write> {
    link: AmdcLink<T>,
}

impl<T: Read + Write> Cramb<T> {
    pub fn new(link: AmdcLink<T>) -> Self {
        Self { link }
    }

    /// Send a raw command line
    pub fn send(&mut self, command: &str) -> Result<Vec<String>> {
        self.link.cmd(command)
    }

    pub fn link(&mut self) -> &mut AmdcLink<T> {
        &mut self.link
    }

    // === Radial stage ===

    /// Enable the radial current regulators
    pub fn cc_on(&mut self) -> Result<Vec<String>> {
        self.link.cmd("cramb init_cc")
    }

    pub fn cc_off(&mut self) -> Result<Vec<String>> {
        self.link.cmd("cramb deinit_cc")
    }

    /// Command phase currents I1, I2 (A); I3 follows from the zero sum
    pub fn set_currents(&mut self, i1: f64, i2: f64) -> Result<Vec<String>> {
        self.link.cmd(&format!("cramb set_currents {} {}", micro(i1), micro(i2)))
    }

    /// Pole voltages (V) measured from the negative DC rail
    pub fn pole_volts(&mut self, va: f64, vb: f64, vc: f64) -> Result<Vec<String>> {
        self.link.cmd(&format!(
            "cramb pole_volts {} {} {}",
            micro(va),
            micro(vb),
            micro(vc)
        ))
    }

    /// Phase voltages (V) measured from the Vdc/2 neutral
    pub fn phase_volts(&mut self, va: f64, vb: f64, vc: f64) -> Result<Vec<String>> {
        self.link.cmd(&format!(
            "cramb phase_volts {} {} {}",
            micro(va),
            micro(vb),
            micro(vc)
        ))
    }

    /// Drop to a safe state: no current, regulators off, no voltage
    pub fn zero(&mut self) -> Result<()> {
        self.set_currents(0.0, 0.0)?;
        self.cc_off()?;
        self.pole_volts(0.0, 0.0, 0.0)?;
        Ok(())
    }

    /// ADC voltages of the three radial phases
    pub fn read_adc(&mut self) -> Result<[f64; 3]> {
        self.read_triplet("cramb read_adc")
    }

    /// Measured radial phase currents (A)
    pub fn read_currents(&mut self) -> Result<[f64; 3]> {
        self.read_triplet("cramb read_currents")
    }

    /// DC bus voltage (V)
    pub fn set_vdc(&mut self, vdc: f64) -> Result<Vec<String>> {
        self.link.cmd(&format!("cramb set_vdc {}", milli(vdc)))
    }

    /// Current regulator tuning from coil R (Ω), L (H) and bandwidth (Hz)
    pub fn set_cc_gains(&mut self, r: f64, l: f64, bandwidth: f64) -> Result<Vec<String>> {
        self.link.cmd(&format!(
            "cramb set_cc_gains {} {} {}",
            milli(r),
            micro(l),
            bandwidth as i64
        ))
    }

    /// Move the radial stage to another inverter; zeroes the outputs first
    pub fn set_inverter(&mut self, number: u8) -> Result<Vec<String>> {
        self.zero()?;
        if !RADIAL_INVERTERS.contains(&number) {
            return Err(AmdcError::InvalidInverter {
                number,
                stage: "radial",
            });
        }
        self.link.cmd(&format!("cramb set_inverter {}", number - 1))
    }

    pub fn pwm_reset(&mut self) -> Result<Vec<String>> {
        self.link.cmd("cramb pwm_reset")
    }

    /// Allocate a radial force and command the resulting phase currents
    ///
    /// Returns the commanded currents (A).
    pub fn apply_force<M: BearingModel>(
        &mut self,
        allocator: &ForceAllocator<M>,
        direction_deg: f64,
        magnitude: f64,
    ) -> Result<[f64; 3]> {
        let currents =
            allocator.control_currents(direction_deg, magnitude, CurrentUnits::Amps, true)?;
        info!(
            "{} N at {}° -> I = [{:.4}, {:.4}, {:.4}] A",
            magnitude, direction_deg, currents[0], currents[1], currents[2]
        );
        self.set_currents(currents[0], currents[1])?;
        Ok(currents.into())
    }

    // === Axial stage ===

    pub fn axial_cc_on(&mut self) -> Result<Vec<String>> {
        self.link.cmd("cramb_axial init_cc")
    }

    pub fn axial_cc_off(&mut self) -> Result<Vec<String>> {
        self.link.cmd("cramb_axial deinit_cc")
    }

    /// Axial coil current (A)
    pub fn axial_current(&mut self, current: f64) -> Result<Vec<String>> {
        self.link.cmd(&format!("cramb_axial set_current {}", micro(current)))
    }

    pub fn axial_pole_volts(&mut self, va: f64, vb: f64) -> Result<Vec<String>> {
        self.link.cmd(&format!(
            "cramb_axial pole_volts {} {}",
            micro(va),
            micro(vb)
        ))
    }

    /// Axial coil voltage (V)
    pub fn axial_voltage(&mut self, voltage: f64) -> Result<Vec<String>> {
        self.link.cmd(&format!("cramb_axial set_volts {}", micro(voltage)))
    }

    pub fn axial_zero(&mut self) -> Result<()> {
        self.axial_current(0.0)?;
        self.axial_cc_off()?;
        self.axial_pole_volts(0.0, 0.0)?;
        Ok(())
    }

    pub fn axial_read_adc(&mut self) -> Result<f64> {
        self.read_single("cramb_axial read_adc")
    }

    pub fn axial_read_current(&mut self) -> Result<f64> {
        self.read_single("cramb_axial read_current")
    }

    pub fn axial_set_vdc(&mut self, vdc: f64) -> Result<Vec<String>> {
        self.link.cmd(&format!("cramb_axial set_vdc {}", milli(vdc)))
    }

    pub fn axial_set_cc_gains(&mut self, r: f64, l: f64, bandwidth: f64) -> Result<Vec<String>> {
        self.link.cmd(&format!(
            "cramb_axial set_cc_gains {} {} {}",
            milli(r),
            micro(l),
            bandwidth as i64
        ))
    }

    pub fn axial_set_inverter(&mut self, number: u8) -> Result<Vec<String>> {
        self.axial_zero()?;
        if !AXIAL_INVERTERS.contains(&number) {
            return Err(AmdcError::InvalidInverter {
                number,
                stage: "axial",
            });
        }
        self.link.cmd(&format!("cramb_axial set_inverter {}", number - 1))
    }

    // Output line 0 is the echoed command
    fn read_triplet(&mut self, command: &str) -> Result<[f64; 3]> {
        let out = self.link.cmd(command)?;
        let mut values = [0.0; 3];
        for (k, value) in values.iter_mut().enumerate() {
            *value = parse_line(command, &out, k + 1)?;
        }
        Ok(values)
    }

    fn read_single(&mut self, command: &str) -> Result<f64> {
        let out = self.link.cmd(command)?;
        parse_line(command, &out, 1)
    }
}

impl<T: Read + Write> Drop for Cramb<T> {
    fn drop(&mut self) {
        // leave the bearing unpowered
        if let Err(e) = self.zero() {
            warn!("Failed to zero radial stage on drop: {}", e);
        }
    }
}

fn parse_line(command: &str, out: &[String], line: usize) -> Result<f64> {
    let text = out.get(line).ok_or_else(|| AmdcError::UnexpectedResponse {
        command: command.to_string(),
        reason: format!("expected at least {} lines, got {}", line + 1, out.len()),
    })?;
    text.trim()
        .parse()
        .map_err(|_| AmdcError::UnexpectedResponse {
            command: command.to_string(),
            reason: format!("line {} is not a number: '{}'", line, text),
        })
}
