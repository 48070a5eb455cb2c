//! RMS voltage/current decoding.
//!
//! DSP_REG14 (channel 1) and DSP_REG15 (channel 2) pack both RMS values of a
//! channel into one word: voltage in bits 14..0, current from bit 15 upwards.

use crate::data_types::{
    Channel, ChannelReading, LatchMode, Measurement, OverflowPolicy, RmsCurrentWidth, Unit,
};
use crate::driver::Stpm3x;
use crate::error::Error;
use crate::registers::{rms_current_count, rms_voltage_count, DspCr3Bits, Register};

impl Channel {
    /// Register holding this channel's packed RMS values.
    pub fn rms_register(&self) -> Register {
        match self {
            Channel::One => Register::DSP_REG14,
            Channel::Two => Register::DSP_REG15,
        }
    }

    /// DSP_CR3 bit that freezes this channel's data registers.
    pub fn latch_bit(&self) -> DspCr3Bits {
        match self {
            Channel::One => DspCr3Bits::SW_LATCH1,
            Channel::Two => DspCr3Bits::SW_LATCH2,
        }
    }
}

/// `floor(count * lsb)` fitted into 16 bits.
pub fn scale_count(count: u32, lsb: f32, policy: OverflowPolicy) -> u16 {
    // Non-negative, so truncation is floor; `as` saturates at the u64 range.
    let scaled = (count as f32 * lsb) as u64;
    match policy {
        OverflowPolicy::Wrap => scaled as u16,
        OverflowPolicy::Saturate => scaled.min(u16::MAX as u64) as u16,
    }
}

/// Voltage RMS in millivolts from a raw DSP_REG14/15 word.
pub fn decode_voltage(raw: u32, lsb: f32, policy: OverflowPolicy) -> Measurement {
    Measurement::milli(scale_count(rms_voltage_count(raw), lsb, policy), Unit::Volt)
}

/// Current RMS in milliamperes from a raw DSP_REG14/15 word.
pub fn decode_current(raw: u32, lsb: f32, width: RmsCurrentWidth, policy: OverflowPolicy) -> Measurement {
    Measurement::milli(scale_count(rms_current_count(raw, width), lsb, policy), Unit::Ampere)
}

impl<SPI, P, D> Stpm3x<SPI, P, D> {
    fn decode_reading(&self, raw: u32) -> ChannelReading {
        let c = &self.config;
        ChannelReading {
            voltage: decode_voltage(raw, c.voltage_lsb, c.overflow),
            current: decode_current(raw, c.current_lsb, c.current_width, c.overflow),
        }
    }
}

impl<SPI, P, D> Stpm3x<SPI, P, D>
where
    SPI: embedded_hal::spi::SpiBus,
    P: embedded_hal::digital::OutputPin,
    D: embedded_hal::delay::DelayNs,
{
    /// Current RMS of `channel`, in milliamperes.
    pub fn read_current_channel(&mut self, channel: Channel) -> Result<Measurement, Error<SPI::Error, P::Error>> {
        Ok(self.read_channel(channel)?.current)
    }

    /// Voltage RMS of `channel`, in millivolts.
    pub fn read_voltage_channel(&mut self, channel: Channel) -> Result<Measurement, Error<SPI::Error, P::Error>> {
        Ok(self.read_channel(channel)?.voltage)
    }

    /// Both RMS values of `channel` from a single register read.
    pub fn read_channel(&mut self, channel: Channel) -> Result<ChannelReading, Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        if self.config.latch == LatchMode::Software {
            let bit = channel.latch_bit().bits();
            self.update_raw(Register::DSP_CR3, bit, bit)?;
        }
        let raw = self.read_raw(channel.rms_register())?.value;
        Ok(self.decode_reading(raw))
    }
}

#[cfg(feature = "async")]
impl<SPI, P, D> Stpm3x<SPI, P, D>
where
    SPI: embedded_hal_async::spi::SpiBus,
    P: embedded_hal::digital::OutputPin,
    D: embedded_hal_async::delay::DelayNs,
{
    pub async fn read_current_channel_async(
        &mut self,
        channel: Channel,
    ) -> Result<Measurement, Error<SPI::Error, P::Error>> {
        Ok(self.read_channel_async(channel).await?.current)
    }

    pub async fn read_voltage_channel_async(
        &mut self,
        channel: Channel,
    ) -> Result<Measurement, Error<SPI::Error, P::Error>> {
        Ok(self.read_channel_async(channel).await?.voltage)
    }

    pub async fn read_channel_async(&mut self, channel: Channel) -> Result<ChannelReading, Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        if self.config.latch == LatchMode::Software {
            let bit = channel.latch_bit().bits();
            self.update_raw_async(Register::DSP_CR3, bit, bit).await?;
        }
        let raw = self.read_raw_async(channel.rms_register()).await?.value;
        Ok(self.decode_reading(raw))
    }
}
