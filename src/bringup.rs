//! Power-up, reset and configuration sequence.
//!
//! After power-on the STPM3x needs its DSP and its communication port reset
//! (three SYN pulses and one SCS pulse, DS10272 "Global startup reset") before
//! any register write sticks. Only then are gain, port and latch settings written,
//! and DSP_CR3 is read back to prove the port accepts them.

use embedded_hal::digital::PinState;

use crate::data_types::{BringUpState, Config, Timings};
use crate::driver::Stpm3x;
use crate::error::Error;
use crate::registers::{dsp_cr3_value, gain_code, DspCr3Bits, Register, US_REG1_CONFIG};

/// SYN pulses needed to reset the DSP.
pub const RESET_SYN_PULSES: usize = 3;

/// Register writes of the configuration step, in the order they go out.
pub(crate) fn configuration_writes(config: &Config) -> ([(Register, u32); 6], usize) {
    let gain = gain_code(config.gain);
    let mut writes = [
        (Register::DFE_CR1, gain),
        (Register::DFE_CR2, gain),
        (Register::US_REG1, US_REG1_CONFIG),
        (Register::DSP_CR3, dsp_cr3_value(config.latch)),
        (Register::DSP_IRQ1, 0),
        (Register::DSP_IRQ2, 0),
    ];
    match config.interrupts {
        Some(irq) => {
            writes[4].1 = irq.dsp_irq1_mask;
            writes[5].1 = irq.dsp_irq2_mask;
            (writes, 6)
        }
        None => (writes, 4),
    }
}

impl<SPI, P, D> Stpm3x<SPI, P, D>
where
    SPI: embedded_hal::spi::ErrorType,
    P: embedded_hal::digital::OutputPin,
{
    /// Idle levels: chip deselected, SYN released, EN low.
    fn configure_lines(&mut self) -> Result<(), Error<SPI::Error, P::Error>> {
        self.lines.scs.set_high().map_err(Error::Pin)?;
        self.lines.syn.set_high().map_err(Error::Pin)?;
        self.set_enable(PinState::Low)
    }

    fn set_enable(&mut self, state: PinState) -> Result<(), Error<SPI::Error, P::Error>> {
        match self.lines.en.as_mut() {
            Some(en) => en.set_state(state).map_err(Error::Pin),
            None => Ok(()),
        }
    }
}

impl<SPI, P, D> Stpm3x<SPI, P, D>
where
    SPI: embedded_hal::spi::SpiBus,
    P: embedded_hal::digital::OutputPin,
    D: embedded_hal::delay::DelayNs,
{
    /// Run the full bring-up from scratch. On success the device is `Ready`;
    /// on any failure it is `Failed` and only another `bring_up` can recover it.
    pub fn bring_up(&mut self) -> Result<(), Error<SPI::Error, P::Error>> {
        self.disarm_interrupts();
        self.state = BringUpState::Uninitialized;
        let result = self.run_bring_up();
        if result.is_err() {
            self.state = BringUpState::Failed;
        }
        result
    }

    fn run_bring_up(&mut self) -> Result<(), Error<SPI::Error, P::Error>> {
        let t = self.config.timings;

        self.configure_lines()?;
        self.state = BringUpState::LinesConfigured;

        self.power_up(&t)?;
        self.state = BringUpState::Reset;

        self.reset_pulses(&t)?;
        self.state = BringUpState::CommunicationUnlocked;
        #[cfg(feature = "defmt")]
        defmt::debug!("stpm3x: reset done, configuring");

        let (writes, count) = configuration_writes(&self.config);
        for &(reg, value) in &writes[..count] {
            self.write_raw(reg, value)?;
        }
        self.state = BringUpState::Configured;

        let expected = dsp_cr3_value(self.config.latch);
        let read = self.read_raw(Register::DSP_CR3)?.value;
        if read != expected {
            #[cfg(feature = "defmt")]
            defmt::warn!("stpm3x: DSP_CR3 read back {=u32:#x}, expected {=u32:#x}", read, expected);
            return Err(Error::Verification { expected, read });
        }

        self.delay.delay_us(t.t_ready_us);
        self.state = BringUpState::Ready;
        #[cfg(feature = "defmt")]
        defmt::debug!("stpm3x: ready");
        Ok(())
    }

    /// Single SYN pulse: latches both channels at the same instant.
    pub fn sync_pulse(&mut self) -> Result<(), Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        let t = self.config.timings;
        self.lines.syn.set_low().map_err(Error::Pin)?;
        self.delay.delay_us(t.t_lpw_us);
        self.lines.syn.set_high().map_err(Error::Pin)?;
        self.delay.delay_us(t.t_w_us);
        Ok(())
    }

    /// Reset the DSP through DSP_CR3 `SW_RESET`. All configuration is lost, so the
    /// device drops back to `Uninitialized` and needs a new `bring_up`. An armed
    /// interrupt queue stops accepting events.
    pub fn software_reset(&mut self) -> Result<(), Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        self.disarm_interrupts();
        let reset = DspCr3Bits::SW_RESET.bits();
        self.update_raw(Register::DSP_CR3, reset, reset)?;
        self.state = BringUpState::Uninitialized;
        Ok(())
    }

    fn power_up(&mut self, t: &Timings) -> Result<(), Error<SPI::Error, P::Error>> {
        self.delay.delay_us(t.t_en_us);
        self.set_enable(PinState::Low)?;
        self.lines.scs.set_low().map_err(Error::Pin)?;
        self.delay.delay_us(t.t_if_us);
        self.lines.syn.set_high().map_err(Error::Pin)?;
        self.set_enable(PinState::High)?;
        self.delay.delay_us(t.t_startup_us.saturating_sub(t.t_if_us));
        self.lines.scs.set_high().map_err(Error::Pin)?;
        self.delay.delay_us(t.t_after_scs_us);
        Ok(())
    }

    fn reset_pulses(&mut self, t: &Timings) -> Result<(), Error<SPI::Error, P::Error>> {
        for _ in 0..RESET_SYN_PULSES {
            self.lines.syn.set_low().map_err(Error::Pin)?;
            self.delay.delay_us(t.t_rpw_us);
            self.lines.syn.set_high().map_err(Error::Pin)?;
            self.delay.delay_us(t.t_rpw_us);
        }
        self.delay.delay_us(t.t_scs_reset_us);
        self.lines.scs.set_low().map_err(Error::Pin)?;
        self.delay.delay_us(t.t_rpw_us);
        self.lines.scs.set_high().map_err(Error::Pin)
    }
}

#[cfg(feature = "async")]
impl<SPI, P, D> Stpm3x<SPI, P, D>
where
    SPI: embedded_hal_async::spi::SpiBus,
    P: embedded_hal::digital::OutputPin,
    D: embedded_hal_async::delay::DelayNs,
{
    /// Async version of [`bring_up`](Self::bring_up).
    pub async fn bring_up_async(&mut self) -> Result<(), Error<SPI::Error, P::Error>> {
        self.disarm_interrupts();
        self.state = BringUpState::Uninitialized;
        let result = self.run_bring_up_async().await;
        if result.is_err() {
            self.state = BringUpState::Failed;
        }
        result
    }

    async fn run_bring_up_async(&mut self) -> Result<(), Error<SPI::Error, P::Error>> {
        let t = self.config.timings;

        self.configure_lines()?;
        self.state = BringUpState::LinesConfigured;

        self.power_up_async(&t).await?;
        self.state = BringUpState::Reset;

        self.reset_pulses_async(&t).await?;
        self.state = BringUpState::CommunicationUnlocked;
        #[cfg(feature = "defmt")]
        defmt::debug!("stpm3x: reset done, configuring");

        let (writes, count) = configuration_writes(&self.config);
        for &(reg, value) in &writes[..count] {
            self.write_raw_async(reg, value).await?;
        }
        self.state = BringUpState::Configured;

        let expected = dsp_cr3_value(self.config.latch);
        let read = self.read_raw_async(Register::DSP_CR3).await?.value;
        if read != expected {
            #[cfg(feature = "defmt")]
            defmt::warn!("stpm3x: DSP_CR3 read back {=u32:#x}, expected {=u32:#x}", read, expected);
            return Err(Error::Verification { expected, read });
        }

        self.delay.delay_us(t.t_ready_us).await;
        self.state = BringUpState::Ready;
        #[cfg(feature = "defmt")]
        defmt::debug!("stpm3x: ready");
        Ok(())
    }

    pub async fn sync_pulse_async(&mut self) -> Result<(), Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        let t = self.config.timings;
        self.lines.syn.set_low().map_err(Error::Pin)?;
        self.delay.delay_us(t.t_lpw_us).await;
        self.lines.syn.set_high().map_err(Error::Pin)?;
        self.delay.delay_us(t.t_w_us).await;
        Ok(())
    }

    pub async fn software_reset_async(&mut self) -> Result<(), Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        self.disarm_interrupts();
        let reset = DspCr3Bits::SW_RESET.bits();
        self.update_raw_async(Register::DSP_CR3, reset, reset).await?;
        self.state = BringUpState::Uninitialized;
        Ok(())
    }

    async fn power_up_async(&mut self, t: &Timings) -> Result<(), Error<SPI::Error, P::Error>> {
        self.delay.delay_us(t.t_en_us).await;
        self.set_enable(PinState::Low)?;
        self.lines.scs.set_low().map_err(Error::Pin)?;
        self.delay.delay_us(t.t_if_us).await;
        self.lines.syn.set_high().map_err(Error::Pin)?;
        self.set_enable(PinState::High)?;
        self.delay.delay_us(t.t_startup_us.saturating_sub(t.t_if_us)).await;
        self.lines.scs.set_high().map_err(Error::Pin)?;
        self.delay.delay_us(t.t_after_scs_us).await;
        Ok(())
    }

    async fn reset_pulses_async(&mut self, t: &Timings) -> Result<(), Error<SPI::Error, P::Error>> {
        for _ in 0..RESET_SYN_PULSES {
            self.lines.syn.set_low().map_err(Error::Pin)?;
            self.delay.delay_us(t.t_rpw_us).await;
            self.lines.syn.set_high().map_err(Error::Pin)?;
            self.delay.delay_us(t.t_rpw_us).await;
        }
        self.delay.delay_us(t.t_scs_reset_us).await;
        self.lines.scs.set_low().map_err(Error::Pin)?;
        self.delay.delay_us(t.t_rpw_us).await;
        self.lines.scs.set_high().map_err(Error::Pin)
    }
}
