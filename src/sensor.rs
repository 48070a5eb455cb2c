//! Read-only sensor endpoints, one per measured quantity.
//!
//! A device exposes four endpoints in a fixed order so generic sensor registries
//! can enumerate them: channel 1 current, channel 1 voltage, channel 2 current,
//! channel 2 voltage.

use crate::data_types::{Channel, Measurement, Unit};
use crate::driver::Stpm3x;
use crate::error::Error;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Endpoint {
    Current1,
    Voltage1,
    Current2,
    Voltage2,
}

/// All endpoints of one device, in registration order.
pub const ENDPOINTS: [Endpoint; 4] = [
    Endpoint::Current1,
    Endpoint::Voltage1,
    Endpoint::Current2,
    Endpoint::Voltage2,
];

impl Endpoint {
    pub fn channel(&self) -> Channel {
        match self {
            Endpoint::Current1 | Endpoint::Voltage1 => Channel::One,
            Endpoint::Current2 | Endpoint::Voltage2 => Channel::Two,
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            Endpoint::Current1 | Endpoint::Current2 => Unit::Ampere,
            Endpoint::Voltage1 | Endpoint::Voltage2 => Unit::Volt,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::Current1 => "current1",
            Endpoint::Voltage1 => "voltage1",
            Endpoint::Current2 => "current2",
            Endpoint::Voltage2 => "voltage2",
        }
    }
}

impl<SPI, P, D> Stpm3x<SPI, P, D>
where
    SPI: embedded_hal::spi::ErrorType,
    P: embedded_hal::digital::ErrorType,
{
    /// Endpoints are read-only.
    pub fn write_endpoint(&mut self, _endpoint: Endpoint, _value: Measurement) -> Result<(), Error<SPI::Error, P::Error>> {
        Err(Error::Unsupported)
    }
}

impl<SPI, P, D> Stpm3x<SPI, P, D>
where
    SPI: embedded_hal::spi::SpiBus,
    P: embedded_hal::digital::OutputPin,
    D: embedded_hal::delay::DelayNs,
{
    pub fn read_endpoint(&mut self, endpoint: Endpoint) -> Result<Measurement, Error<SPI::Error, P::Error>> {
        match endpoint.unit() {
            Unit::Ampere => self.read_current_channel(endpoint.channel()),
            Unit::Volt => self.read_voltage_channel(endpoint.channel()),
        }
    }
}

#[cfg(feature = "async")]
impl<SPI, P, D> Stpm3x<SPI, P, D>
where
    SPI: embedded_hal_async::spi::SpiBus,
    P: embedded_hal::digital::OutputPin,
    D: embedded_hal_async::delay::DelayNs,
{
    pub async fn read_endpoint_async(&mut self, endpoint: Endpoint) -> Result<Measurement, Error<SPI::Error, P::Error>> {
        match endpoint.unit() {
            Unit::Ampere => self.read_current_channel_async(endpoint.channel()).await,
            Unit::Volt => self.read_voltage_channel_async(endpoint.channel()).await,
        }
    }
}
