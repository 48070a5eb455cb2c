//! INT1/INT2 handling.
//!
//! The pin ISR only records which line fired ([`IrqQueue::notify`]); the status
//! registers are read and cleared later from task context through the driver.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;

use crate::driver::Stpm3x;
use crate::error::Error;
use crate::registers::{DspStatus, Register};

/// Interrupt output of the STPM3x.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IrqSource {
    Int1,
    Int2,
}

impl IrqSource {
    /// Status register behind this line (INT1 reports DSP_SR1, INT2 DSP_SR2).
    pub fn status_register(&self) -> Register {
        match self {
            IrqSource::Int1 => Register::DSP_SR1,
            IrqSource::Int2 => Register::DSP_SR2,
        }
    }
}

/// Events from pin ISRs, handed to the task that owns the driver.
///
/// Disarmed until the driver has been brought up and [`Stpm3x::enable_interrupts`] ran;
/// events arriving before that are dropped. The driver disarms it again as soon as the
/// device leaves `Ready` (new bring-up, failed verification, software reset).
pub struct IrqQueue<M: RawMutex, const N: usize> {
    events: Channel<M, IrqSource, N>,
    armed: AtomicBool,
}

impl<M: RawMutex, const N: usize> IrqQueue<M, N> {
    pub const fn new() -> Self {
        Self {
            events: Channel::new(),
            armed: AtomicBool::new(false),
        }
    }

    /// Record an edge on `source`. Never blocks; returns `false` if the event was dropped.
    pub fn notify(&self, source: IrqSource) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.events.try_send(source).is_ok()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub(crate) fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Stop accepting events and discard the ones still queued.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
        while self.events.try_receive().is_ok() {}
    }

    /// Next pending event, if any.
    pub fn try_next(&self) -> Option<IrqSource> {
        self.events.try_receive().ok()
    }

    /// Wait for the next event.
    pub async fn next(&self) -> IrqSource {
        self.events.receive().await
    }
}

impl<M: RawMutex, const N: usize> Default for IrqQueue<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Value that clears every latched bit of a write-1-to-clear status register.
const CLEAR_ALL: u32 = u32::MAX;

impl<SPI, P, D> Stpm3x<SPI, P, D> {
    /// Stop the armed queue, if any, from accepting events.
    pub(crate) fn disarm_interrupts(&mut self) {
        if let Some(armed) = self.irq_armed.take() {
            armed.store(false, Ordering::Release);
        }
    }

    /// Arm `queue` and keep its flag so leaving `Ready` disarms it.
    fn attach_queue<M: RawMutex, const N: usize>(&mut self, queue: &'static IrqQueue<M, N>) {
        queue.arm();
        self.irq_armed = Some(&queue.armed);
    }
}

impl<SPI, P, D> Stpm3x<SPI, P, D>
where
    SPI: embedded_hal::spi::SpiBus,
    P: embedded_hal::digital::OutputPin,
    D: embedded_hal::delay::DelayNs,
{
    /// Clear stale status and start accepting events on `queue`. Only after bring-up.
    pub fn enable_interrupts<M: RawMutex, const N: usize>(
        &mut self,
        queue: &'static IrqQueue<M, N>,
    ) -> Result<(), Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        self.disarm_interrupts();
        queue.disarm();
        self.write_raw(Register::DSP_SR1, CLEAR_ALL)?;
        self.write_raw(Register::DSP_SR2, CLEAR_ALL)?;
        self.attach_queue(queue);
        Ok(())
    }

    /// Read and clear the status register behind `source`.
    pub fn service_interrupt(&mut self, source: IrqSource) -> Result<DspStatus, Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        let reg = source.status_register();
        let bits = self.read_raw(reg)?.value;
        if bits != 0 {
            self.write_raw(reg, bits)?;
        }
        Ok(DspStatus::from_bits_retain(bits))
    }

    /// Service every queued event, handing each status to `handler`. Returns how many ran.
    pub fn service_pending<M: RawMutex, const N: usize>(
        &mut self,
        queue: &IrqQueue<M, N>,
        mut handler: impl FnMut(IrqSource, DspStatus),
    ) -> Result<usize, Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        let mut serviced = 0;
        while let Some(source) = queue.try_next() {
            let status = self.service_interrupt(source)?;
            handler(source, status);
            serviced += 1;
        }
        Ok(serviced)
    }
}

#[cfg(feature = "async")]
impl<SPI, P, D> Stpm3x<SPI, P, D>
where
    SPI: embedded_hal_async::spi::SpiBus,
    P: embedded_hal::digital::OutputPin,
    D: embedded_hal_async::delay::DelayNs,
{
    pub async fn enable_interrupts_async<M: RawMutex, const N: usize>(
        &mut self,
        queue: &'static IrqQueue<M, N>,
    ) -> Result<(), Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        self.disarm_interrupts();
        queue.disarm();
        self.write_raw_async(Register::DSP_SR1, CLEAR_ALL).await?;
        self.write_raw_async(Register::DSP_SR2, CLEAR_ALL).await?;
        self.attach_queue(queue);
        Ok(())
    }

    pub async fn service_interrupt_async(
        &mut self,
        source: IrqSource,
    ) -> Result<DspStatus, Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        let reg = source.status_register();
        let bits = self.read_raw_async(reg).await?.value;
        if bits != 0 {
            self.write_raw_async(reg, bits).await?;
        }
        Ok(DspStatus::from_bits_retain(bits))
    }

    /// Wait for one event on `queue` and service it.
    pub async fn run_interrupts_once_async<M: RawMutex, const N: usize>(
        &mut self,
        queue: &IrqQueue<M, N>,
    ) -> Result<(IrqSource, DspStatus), Error<SPI::Error, P::Error>> {
        self.require_ready()?;
        let source = queue.next().await;
        let status = self.service_interrupt_async(source).await?;
        Ok((source, status))
    }
}
