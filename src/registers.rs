//! Register map and constants for the STPM3x family.
//! Addresses and field layouts follow the STPM32/33/34 datasheet (DS10272) register tables.

use crate::checksum::CRC_POLYNOMIAL;
use crate::data_types::{CurrentGain, LatchMode, RmsCurrentWidth};

/// 32-bit registers, each addressed as two 16-bit half-words at `addr()` and `addr() + 1`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[allow(non_camel_case_types)]
#[repr(u8)]
pub enum Register {
    /// DSP control register 1
    DSP_CR1 = 0x00,
    /// DSP control register 2
    DSP_CR2 = 0x02,
    /// DSP control register 3 (latch, reset, ZCR, reference frequency)
    DSP_CR3 = 0x04,
    /// DSP control register 4 (phase compensation)
    DSP_CR4 = 0x06,
    /// DSP control register 5 (V1 calibration, swell/sag thresholds)
    DSP_CR5 = 0x08,
    /// DSP control register 6 (C1 calibration, swell threshold)
    DSP_CR6 = 0x0A,
    /// DSP control register 7 (V2 calibration, swell/sag thresholds)
    DSP_CR7 = 0x0C,
    /// DSP control register 8 (C2 calibration, swell threshold)
    DSP_CR8 = 0x0E,
    DSP_CR9 = 0x10,
    DSP_CR10 = 0x12,
    DSP_CR11 = 0x14,
    DSP_CR12 = 0x16,
    /// Digital front end control register 1 (channel 1 enables and current gain)
    DFE_CR1 = 0x18,
    /// Digital front end control register 2 (channel 2 enables and current gain)
    DFE_CR2 = 0x1A,
    /// DSP interrupt control mask register 1
    DSP_IRQ1 = 0x1C,
    /// DSP interrupt control mask register 2
    DSP_IRQ2 = 0x1E,
    /// DSP status register 1 (write 1 to clear)
    DSP_SR1 = 0x20,
    /// DSP status register 2 (write 1 to clear)
    DSP_SR2 = 0x22,
    /// UART/SPI control register 1 (CRC, timeout)
    US_REG1 = 0x24,
    /// UART/SPI control register 2 (baud rate, frame delay)
    US_REG2 = 0x26,
    /// UART/SPI interrupt control and status
    US_REG3 = 0x28,
    DSP_EV1 = 0x2A,
    DSP_EV2 = 0x2C,
    /// PH1/PH2 period
    DSP_REG1 = 0x2E,
    /// V1 data
    DSP_REG2 = 0x30,
    /// C1 data
    DSP_REG3 = 0x32,
    /// V2 data
    DSP_REG4 = 0x34,
    /// C2 data
    DSP_REG5 = 0x36,
    /// V1 fundamental
    DSP_REG6 = 0x38,
    /// C1 fundamental
    DSP_REG7 = 0x3A,
    /// V2 fundamental
    DSP_REG8 = 0x3C,
    /// C2 fundamental
    DSP_REG9 = 0x3E,
    /// C1/V1 RMS data
    DSP_REG14 = 0x48,
    /// C2/V2 RMS data
    DSP_REG15 = 0x4A,
    DSP_REG16 = 0x4C,
    DSP_REG17 = 0x4E,
    DSP_REG18 = 0x50,
    DSP_REG19 = 0x52,
    /// PH1 active energy
    PH1_REG1 = 0x54,
    PH1_REG2 = 0x56,
    PH1_REG3 = 0x58,
    PH1_REG4 = 0x5A,
    /// PH1 active power
    PH1_REG5 = 0x5C,
    PH1_REG6 = 0x5E,
    PH1_REG7 = 0x60,
    PH1_REG8 = 0x62,
    PH1_REG9 = 0x64,
    PH1_REG10 = 0x66,
    PH1_REG11 = 0x68,
    PH1_REG12 = 0x6A,
    /// PH2 active energy
    PH2_REG1 = 0x6C,
    PH2_REG2 = 0x6E,
    PH2_REG3 = 0x70,
    PH2_REG4 = 0x72,
    /// PH2 active power
    PH2_REG5 = 0x74,
    PH2_REG6 = 0x76,
    PH2_REG7 = 0x78,
    PH2_REG8 = 0x7A,
    PH2_REG9 = 0x7C,
    PH2_REG10 = 0x7E,
    PH2_REG11 = 0x80,
    PH2_REG12 = 0x82,
    /// Total active energy
    TOT_REG1 = 0x84,
    TOT_REG2 = 0x86,
    TOT_REG3 = 0x88,
    TOT_REG4 = 0x8A,
}

impl Register {
    /// Address of the low half-word.
    pub const fn addr(self) -> u8 {
        self as u8
    }

    /// Address of the high half-word.
    pub const fn addr_high(self) -> u8 {
        self as u8 + 1
    }
}

/// DSP_CR3 reset value (datasheet default, auto-latch off).
pub const DSP_CR3_DEFAULT: u32 = 0x0000_04E0;

/// SPI timeout written to US_REG1 bits 23-16 (0x50 = 80 ms).
pub const US_TIMEOUT: u8 = 0x50;

/// US_REG1 with CRC enabled (poly 0x07, MSB first) and the SPI timeout above.
pub const US_REG1_CONFIG: u32 =
    (US_TIMEOUT as u32) << 16 | UsReg1Bits::CRC_EN.bits() | CRC_POLYNOMIAL as u32;

/// Voltage RMS field of DSP_REG14/15.
pub const RMS_VOLTAGE_MASK: u32 = 0x7FFF;
/// First bit of the current RMS field of DSP_REG14/15.
pub const RMS_CURRENT_SHIFT: u32 = 15;

bitflags::bitflags! {
    /// DSP_CR3 bits (0x04).
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct DspCr3Bits: u32 {
        /// Bit 16: zero-crossing output enable.
        const ZCR_EN      = 1 << 16;
        /// Bit 19: temperature compensation enable.
        const TMP_EN      = 1 << 19;
        /// Bit 20: DSP software reset (self-clearing).
        const SW_RESET    = 1 << 20;
        /// Bit 21: latch channel 1 data registers.
        const SW_LATCH1   = 1 << 21;
        /// Bit 22: latch channel 2 data registers.
        const SW_LATCH2   = 1 << 22;
        /// Bit 23: latch automatically at 7.8125 kHz.
        const SW_AUTO_LATCH = 1 << 23;
        const LED_OFF1    = 1 << 24;
        const LED_OFF2    = 1 << 25;
        const EN_CUM      = 1 << 26;
        /// Bit 27: 60 Hz reference frequency.
        const REF_FREQ    = 1 << 27;
    }

    /// US_REG1 bits (0x24). Bits 7-0 hold the CRC polynomial, bits 23-16 the timeout.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct UsReg1Bits: u32 {
        const CRC_EN       = 1 << 14;
        const LSB_FIRST    = 1 << 15;
    }

    /// DSP_SR1 / DSP_SR2 status bits. Both registers share the layout; SR1 covers
    /// channel 1 (V1/C1/PH1) and SR2 channel 2.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct DspStatus: u32 {
        const TOTAL_ACTIVE_SIGN       = 1 << 0;
        const TOTAL_REACTIVE_SIGN     = 1 << 1;
        const TOTAL_ACTIVE_OVERFLOW   = 1 << 2;
        const TOTAL_REACTIVE_OVERFLOW = 1 << 3;
        const C_SIGNAL_STUCK          = 1 << 20;
        const C_NAH                   = 1 << 21;
        const C_SWELL_START           = 1 << 22;
        const C_SWELL_END             = 1 << 23;
        const V_SIGNAL_STUCK          = 1 << 24;
        const V_PERIOD_ERROR          = 1 << 25;
        const V_SAG_START             = 1 << 26;
        const V_SAG_END               = 1 << 27;
        const V_SWELL_START           = 1 << 28;
        const V_SWELL_END             = 1 << 29;
        const TAMPER                  = 1 << 30;
        const TAMPER_OR_WRONG         = 1 << 31;
    }
}

/// Fixed DFE_CRx word selecting `gain` on both halves of the register (datasheet p.88, p.103-104).
pub const fn gain_code(gain: CurrentGain) -> u32 {
    match gain {
        CurrentGain::X2 => 0x0327_0327,
        CurrentGain::X4 => 0x0727_0327,
        CurrentGain::X8 => 0x0B27_0327,
        CurrentGain::X16 => 0x0F27_0327,
    }
}

/// DSP_CR3 value written during bring-up for the chosen latch mode.
pub fn dsp_cr3_value(latch: LatchMode) -> u32 {
    match latch {
        LatchMode::Auto => DSP_CR3_DEFAULT | DspCr3Bits::SW_AUTO_LATCH.bits(),
        LatchMode::Software => DSP_CR3_DEFAULT,
    }
}

/// Mask applied to the current RMS field once shifted down.
pub const fn rms_current_mask(width: RmsCurrentWidth) -> u32 {
    match width {
        RmsCurrentWidth::Bits16 => 0xFFFF,
        RmsCurrentWidth::Bits17 => 0x1_FFFF,
    }
}

/// Extract the raw voltage RMS count from DSP_REG14/15.
pub fn rms_voltage_count(raw: u32) -> u32 {
    raw & RMS_VOLTAGE_MASK
}

/// Extract the raw current RMS count from DSP_REG14/15.
pub fn rms_current_count(raw: u32, width: RmsCurrentWidth) -> u32 {
    (raw >> RMS_CURRENT_SHIFT) & rms_current_mask(width)
}
