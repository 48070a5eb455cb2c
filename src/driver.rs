//! STPM3x driver: device handle and the register transaction layer.
//!
//! Blocking helpers live on the `embedded-hal` bounds; the `async` feature adds
//! `_async` twins on the `embedded-hal-async` bounds with identical bus traffic.

use core::sync::atomic::AtomicBool;

use crate::data_types::{BringUpState, Config};
use crate::error::Error;
use crate::frame::{decode_response, split_register, ChecksumStatus, Frame, Response};
use crate::registers::Register;

/// SPI mode the STPM3x expects (CPOL = 1, CPHA = 1).
pub const SPI_MODE: embedded_hal::spi::Mode = embedded_hal::spi::MODE_3;

/// Control lines next to the SPI bus.
pub struct ControlLines<P> {
    /// Chip select (SCS), active low.
    pub scs: P,
    /// Synchronisation / latch input (SYN), active low pulses.
    pub syn: P,
    /// Enable line (EN). Boards that tie EN high leave this `None`.
    pub en: Option<P>,
}

/// One STPM32/33/34 on an exclusively owned SPI bus.
pub struct Stpm3x<SPI, P, D> {
    pub(crate) spi: SPI,
    pub(crate) lines: ControlLines<P>,
    pub(crate) delay: D,
    pub(crate) config: Config,
    pub(crate) state: BringUpState,
    /// Armed flag of the queue passed to `enable_interrupts`, cleared when leaving `Ready`.
    pub(crate) irq_armed: Option<&'static AtomicBool>,
    checksum_mismatches: u32,
}

impl<SPI, P, D> Stpm3x<SPI, P, D>
where
    SPI: embedded_hal::spi::ErrorType,
    P: embedded_hal::digital::ErrorType,
{
    /// Create a driver. Nothing touches the bus until [`bring_up`](Self::bring_up).
    pub fn new(spi: SPI, lines: ControlLines<P>, delay: D, config: Config) -> Result<Self, Error<SPI::Error, P::Error>> {
        config.validate::<SPI::Error, P::Error>()?;
        Ok(Self {
            spi,
            lines,
            delay,
            config,
            state: BringUpState::Uninitialized,
            irq_armed: None,
            checksum_mismatches: 0,
        })
    }

    /// Give the bus, lines and delay back.
    pub fn release(self) -> (SPI, ControlLines<P>, D) {
        (self.spi, self.lines, self.delay)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> BringUpState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == BringUpState::Ready
    }

    /// Received frames whose checksum did not match since the driver was created.
    pub fn checksum_mismatches(&self) -> u32 {
        self.checksum_mismatches
    }

    pub(crate) fn require_ready(&self) -> Result<(), Error<SPI::Error, P::Error>> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(Error::NotReady(self.state))
        }
    }

    /// Record the checksum verdict of a response and hand the value out regardless.
    pub(crate) fn account(&mut self, _reg: Register, response: &Response) {
        if let ChecksumStatus::Mismatch { .. } = response.checksum {
            self.checksum_mismatches = self.checksum_mismatches.wrapping_add(1);
            #[cfg(feature = "defmt")]
            defmt::warn!("stpm3x: checksum mismatch reading {}: {}", _reg, response.checksum);
        }
    }
}

impl<SPI, P, D> Stpm3x<SPI, P, D>
where
    SPI: embedded_hal::spi::SpiBus,
    P: embedded_hal::digital::OutputPin,
    D: embedded_hal::delay::DelayNs,
{
    /// Read a 32-bit register. Requires a completed bring-up.
    pub fn read_register(&mut self, reg: Register) -> Result<u32, Error<SPI::Error, P::Error>> {
        Ok(self.read_register_checked(reg)?.value)
    }

    /// Read a register and return the checksum verdict alongside the value.
    pub fn read_register_checked(&mut self, reg: Register) -> Result<Response, Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        self.read_raw(reg)
    }

    /// Write a 32-bit register as two half-word frames. Requires a completed bring-up.
    pub fn write_register(&mut self, reg: Register, value: u32) -> Result<(), Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        self.write_raw(reg, value)
    }

    /// Update masked bits in a register (read-modify-write). Returns the value written.
    pub fn update_register(&mut self, reg: Register, mask: u32, bits: u32) -> Result<u32, Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        self.update_raw(reg, mask, bits)
    }

    pub(crate) fn update_raw(&mut self, reg: Register, mask: u32, bits: u32) -> Result<u32, Error<SPI::Error, P::Error>> {
        let current = self.read_raw(reg)?.value;
        let new = (current & !mask) | (bits & mask);
        self.write_raw(reg, new)?;
        Ok(new)
    }

    pub(crate) fn write_raw(&mut self, reg: Register, value: u32) -> Result<(), Error<SPI::Error, P::Error>> {
        let (low, high) = split_register(value);
        self.write_half_word(reg.addr(), low)?;
        self.write_half_word(reg.addr_high(), high)
    }

    pub(crate) fn read_raw(&mut self, reg: Register) -> Result<Response, Error<SPI::Error, P::Error>> {
        self.select()?;
        let rx = match self.read_frames(reg) {
            Ok(rx) => rx,
            Err(e) => {
                self.abort();
                return Err(e);
            }
        };
        self.deselect()?;
        let response = decode_response(&rx);
        self.account(reg, &response);
        Ok(response)
    }

    fn write_half_word(&mut self, address: u8, value: u16) -> Result<(), Error<SPI::Error, P::Error>> {
        let mut buf = *Frame::write(address, value).bytes();
        self.select()?;
        if let Err(e) = self.exchange(&mut buf) {
            self.abort();
            return Err(e);
        }
        self.deselect()
    }

    fn read_frames(&mut self, reg: Register) -> Result<[u8; 5], Error<SPI::Error, P::Error>> {
        let mut request = *Frame::read_request(reg.addr()).bytes();
        self.exchange(&mut request)?;
        let mut answer = *Frame::read_continue().bytes();
        self.exchange(&mut answer)?;
        Ok(answer)
    }

    /// One frame, clocked out completely, followed by the inter-frame gap.
    fn exchange(&mut self, buf: &mut [u8; 5]) -> Result<(), Error<SPI::Error, P::Error>> {
        self.spi.transfer_in_place(buf).map_err(Error::Bus)?;
        self.spi.flush().map_err(Error::Bus)?;
        self.delay.delay_us(self.config.timings.t_scs_us);
        Ok(())
    }

    fn select(&mut self) -> Result<(), Error<SPI::Error, P::Error>> {
        self.lines.scs.set_low().map_err(Error::Pin)?;
        self.delay.delay_us(self.config.timings.t_scs_us);
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), Error<SPI::Error, P::Error>> {
        self.lines.scs.set_high().map_err(Error::Pin)?;
        self.delay.delay_us(self.config.timings.t_scs_us);
        Ok(())
    }

    /// Leave the chip deselected after a failed transfer; the original error wins.
    fn abort(&mut self) {
        let _ = self.lines.scs.set_high();
    }
}

#[cfg(feature = "async")]
impl<SPI, P, D> Stpm3x<SPI, P, D>
where
    SPI: embedded_hal_async::spi::SpiBus,
    P: embedded_hal::digital::OutputPin,
    D: embedded_hal_async::delay::DelayNs,
{
    /// Async version of [`read_register`](Self::read_register).
    pub async fn read_register_async(&mut self, reg: Register) -> Result<u32, Error<SPI::Error, P::Error>> {
        Ok(self.read_register_checked_async(reg).await?.value)
    }

    pub async fn read_register_checked_async(&mut self, reg: Register) -> Result<Response, Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        self.read_raw_async(reg).await
    }

    pub async fn write_register_async(&mut self, reg: Register, value: u32) -> Result<(), Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        self.write_raw_async(reg, value).await
    }

    pub async fn update_register_async(
        &mut self,
        reg: Register,
        mask: u32,
        bits: u32,
    ) -> Result<u32, Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        self.update_raw_async(reg, mask, bits).await
    }

    pub(crate) async fn update_raw_async(
        &mut self,
        reg: Register,
        mask: u32,
        bits: u32,
    ) -> Result<u32, Error<SPI::Error, P::Error>> {
        let current = self.read_raw_async(reg).await?.value;
        let new = (current & !mask) | (bits & mask);
        self.write_raw_async(reg, new).await?;
        Ok(new)
    }

    pub(crate) async fn write_raw_async(&mut self, reg: Register, value: u32) -> Result<(), Error<SPI::Error, P::Error>> {
        let (low, high) = split_register(value);
        self.write_half_word_async(reg.addr(), low).await?;
        self.write_half_word_async(reg.addr_high(), high).await
    }

    pub(crate) async fn read_raw_async(&mut self, reg: Register) -> Result<Response, Error<SPI::Error, P::Error>> {
        self.select_async().await?;
        let rx = match self.read_frames_async(reg).await {
            Ok(rx) => rx,
            Err(e) => {
                let _ = self.lines.scs.set_high();
                return Err(e);
            }
        };
        self.deselect_async().await?;
        let response = decode_response(&rx);
        self.account(reg, &response);
        Ok(response)
    }

    async fn write_half_word_async(&mut self, address: u8, value: u16) -> Result<(), Error<SPI::Error, P::Error>> {
        let mut buf = *Frame::write(address, value).bytes();
        self.select_async().await?;
        if let Err(e) = self.exchange_async(&mut buf).await {
            let _ = self.lines.scs.set_high();
            return Err(e);
        }
        self.deselect_async().await
    }

    async fn read_frames_async(&mut self, reg: Register) -> Result<[u8; 5], Error<SPI::Error, P::Error>> {
        let mut request = *Frame::read_request(reg.addr()).bytes();
        self.exchange_async(&mut request).await?;
        let mut answer = *Frame::read_continue().bytes();
        self.exchange_async(&mut answer).await?;
        Ok(answer)
    }

    async fn exchange_async(&mut self, buf: &mut [u8; 5]) -> Result<(), Error<SPI::Error, P::Error>> {
        self.spi.transfer_in_place(buf).await.map_err(Error::Bus)?;
        self.spi.flush().await.map_err(Error::Bus)?;
        self.delay.delay_us(self.config.timings.t_scs_us).await;
        Ok(())
    }

    async fn select_async(&mut self) -> Result<(), Error<SPI::Error, P::Error>> {
        self.lines.scs.set_low().map_err(Error::Pin)?;
        self.delay.delay_us(self.config.timings.t_scs_us).await;
        Ok(())
    }

    async fn deselect_async(&mut self) -> Result<(), Error<SPI::Error, P::Error>> {
        self.lines.scs.set_high().map_err(Error::Pin)?;
        self.delay.delay_us(self.config.timings.t_scs_us).await;
        Ok(())
    }
}
