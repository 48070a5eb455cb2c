//! RMS LSB weights from the analog front-end component values.
//!
//! Formulas from DS10272 section "RMS values": the voltage RMS register carries
//! 15 significant bits, the current RMS register 17, and both are scaled by the
//! internal reference and the 12-bit calibrators in DSP_CR5..8.

use crate::data_types::{Config, CurrentGain};

/// Internal bandgap reference in volts.
pub const VOLTAGE_REFERENCE: f32 = 1.18;
/// Calibrator reset value (factor 0.875).
pub const DEFAULT_CALIBRATION: u16 = 0x800;

/// Analog front end around one channel.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrontEnd {
    /// Reference voltage in volts.
    pub voltage_reference: f32,
    /// Resistive divider factor of the voltage input (1 + R1 / R2).
    pub voltage_divider_factor: f32,
    /// Current sensor sensitivity in ohms (shunt value, or burden / turns ratio for a CT).
    pub current_sensitivity_ohm: f32,
    /// 12-bit voltage calibrator (0x000 = 0.75, 0xFFF ~ 1.0).
    pub voltage_calibration: u16,
    /// 12-bit current calibrator.
    pub current_calibration: u16,
}

impl Default for FrontEnd {
    fn default() -> Self {
        Self {
            voltage_reference: VOLTAGE_REFERENCE,
            voltage_divider_factor: 1700.0,
            current_sensitivity_ohm: 0.005,
            voltage_calibration: DEFAULT_CALIBRATION,
            current_calibration: DEFAULT_CALIBRATION,
        }
    }
}

/// Weight of one RMS count, in milli-units.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RmsLsb {
    /// Millivolts per voltage count.
    pub voltage: f32,
    /// Milliamperes per current count.
    pub current: f32,
}

/// Calibrator code to multiplicative factor.
pub fn calibration_factor(code: u16) -> f32 {
    0.75 + (code & 0x0FFF) as f32 * (0.25 / 4096.0)
}

impl FrontEnd {
    pub fn rms_lsb(&self, gain: CurrentGain) -> RmsLsb {
        let cal_v = calibration_factor(self.voltage_calibration);
        let cal_i = calibration_factor(self.current_calibration);
        let voltage = self.voltage_reference * self.voltage_divider_factor / (cal_v * 2.0 * (1u32 << 15) as f32);
        let current = self.voltage_reference
            / (self.current_sensitivity_ohm * cal_i * gain.factor() as f32 * (1u32 << 17) as f32);
        RmsLsb {
            voltage: voltage * 1e3,
            current: current * 1e3,
        }
    }
}

impl Config {
    /// Fill the LSB weights from `front_end` using the configured gain.
    pub fn with_front_end(mut self, front_end: &FrontEnd) -> Self {
        let lsb = front_end.rms_lsb(self.gain);
        self.voltage_lsb = lsb.voltage;
        self.current_lsb = lsb.current;
        self
    }
}
