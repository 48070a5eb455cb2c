//! Data types for the STPM3x driver: configuration, bring-up state and decoded measurements.

use crate::error::Error;

/// Analog current-channel gain (DFE_CRx `GAINx`).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CurrentGain {
    #[default]
    X2,
    X4,
    X8,
    X16,
}

impl CurrentGain {
    /// Nominal amplification factor.
    pub fn factor(&self) -> u8 {
        match self {
            CurrentGain::X2 => 2,
            CurrentGain::X4 => 4,
            CurrentGain::X8 => 8,
            CurrentGain::X16 => 16,
        }
    }
}

/// A nominal gain with no chip code.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InvalidGain(pub u8);

impl TryFrom<u8> for CurrentGain {
    type Error = InvalidGain;

    fn try_from(nominal: u8) -> Result<Self, Self::Error> {
        match nominal {
            2 => Ok(CurrentGain::X2),
            4 => Ok(CurrentGain::X4),
            8 => Ok(CurrentGain::X8),
            16 => Ok(CurrentGain::X16),
            other => Err(InvalidGain(other)),
        }
    }
}

/// How RMS registers are frozen before they are read.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LatchMode {
    /// DSP_CR3 `SW_AUTO_LATCH`: the chip re-latches on its own cadence.
    #[default]
    Auto,
    /// The driver sets `SW_LATCHx` before every read.
    Software,
}

/// Width of the current RMS field in DSP_REG14/15 (16 bits on early revisions, 17 on later ones).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RmsCurrentWidth {
    #[default]
    Bits16,
    Bits17,
}

/// What to do when a scaled value does not fit the 16-bit output.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum OverflowPolicy {
    /// Keep the low 16 bits.
    #[default]
    Wrap,
    /// Clamp to `u16::MAX`.
    Saturate,
}

/// Measurement channel pair (V1/C1 or V2/C2).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Channel {
    One,
    Two,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InvalidChannel(pub u8);

impl TryFrom<u8> for Channel {
    type Error = InvalidChannel;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        match number {
            1 => Ok(Channel::One),
            2 => Ok(Channel::Two),
            other => Err(InvalidChannel(other)),
        }
    }
}

/// Physical unit of a [`Measurement`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Unit {
    Ampere,
    Volt,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Ampere => "ampere",
            Unit::Volt => "volt",
        }
    }
}

/// Decimal exponent of every decoded value (milli-units).
pub const MEASUREMENT_SCALE: i8 = -3;

/// A decoded physical quantity: `value * 10^scale` `unit`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Measurement {
    pub value: u16,
    pub unit: Unit,
    pub scale: i8,
}

impl Measurement {
    pub fn milli(value: u16, unit: Unit) -> Self {
        Self {
            value,
            unit,
            scale: MEASUREMENT_SCALE,
        }
    }
}

/// Voltage and current of one channel pair, decoded from a single register read.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChannelReading {
    pub voltage: Measurement,
    pub current: Measurement,
}

/// Bring-up progress. Moves strictly forward; `Failed` needs a fresh `bring_up`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BringUpState {
    #[default]
    Uninitialized,
    LinesConfigured,
    /// EN/SCS power-up sequence done.
    Reset,
    /// DSP reset pulses and the SCS communication reset done; registers are writable.
    CommunicationUnlocked,
    Configured,
    Ready,
    Failed,
}

/// Control-line and bus timings, in microseconds.
///
/// The SPI port of the STPM3x gets more sensitive to timing as the die warms up;
/// the defaults leave generous margins over the datasheet minimums.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Timings {
    /// Before the first control-line transition.
    pub t_en_us: u32,
    /// EN/SCS low before power-up of the interface.
    pub t_if_us: u32,
    /// Total startup time from EN low until SCS may be released.
    pub t_startup_us: u32,
    /// Settle time after SCS is released at the end of the unlock step.
    pub t_after_scs_us: u32,
    /// Reset pulse width for SYN and SCS during bring-up.
    pub t_rpw_us: u32,
    /// Wait before the communication reset pulse on SCS.
    pub t_scs_reset_us: u32,
    /// Minimum time around every SCS transition and between frames.
    pub t_scs_us: u32,
    /// Latch pulse width of a single SYN pulse.
    pub t_lpw_us: u32,
    /// Spacing after a single SYN pulse.
    pub t_w_us: u32,
    /// Wait after a verified configuration before the first measurement.
    pub t_ready_us: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            t_en_us: 1,
            t_if_us: 10_000,
            t_startup_us: 35_000,
            t_after_scs_us: 100,
            t_rpw_us: 1_000,
            t_scs_reset_us: 1_000,
            t_scs_us: 4,
            t_lpw_us: 10,
            t_w_us: 10,
            t_ready_us: 1_000_000,
        }
    }
}

/// DSP interrupt masks written to DSP_IRQ1/DSP_IRQ2 during bring-up.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct InterruptConfig {
    /// Sources routed to INT1.
    pub dsp_irq1_mask: u32,
    /// Sources routed to INT2.
    pub dsp_irq2_mask: u32,
}

/// Per-device configuration.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Clock the SPI bus was set up with (informational; the HAL owns the bus setup).
    pub spi_clock_hz: u32,
    /// Milli-amperes per current RMS count.
    pub current_lsb: f32,
    /// Milli-volts per voltage RMS count.
    pub voltage_lsb: f32,
    pub gain: CurrentGain,
    pub latch: LatchMode,
    pub current_width: RmsCurrentWidth,
    pub overflow: OverflowPolicy,
    pub timings: Timings,
    /// `Some` when INT1/INT2 are wired and should be programmed.
    pub interrupts: Option<InterruptConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spi_clock_hz: 5_000_000,
            current_lsb: 0.424,
            voltage_lsb: 1.0,
            gain: CurrentGain::X2,
            latch: LatchMode::Auto,
            current_width: RmsCurrentWidth::Bits16,
            overflow: OverflowPolicy::Wrap,
            timings: Timings::default(),
            interrupts: None,
        }
    }
}

impl Config {
    /// Reject scaling constants that cannot produce a meaningful reading.
    pub fn validate<SpiError, PinError>(&self) -> Result<(), Error<SpiError, PinError>> {
        let lsb_ok = |lsb: f32| lsb.is_finite() && lsb >= 0.0;
        if !lsb_ok(self.current_lsb) || !lsb_ok(self.voltage_lsb) {
            return Err(Error::InvalidConfig);
        }
        if self.timings.t_startup_us < self.timings.t_if_us {
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}
