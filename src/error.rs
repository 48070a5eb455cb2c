//! Error definitions for the STPM3x driver.

use crate::data_types::{BringUpState, InvalidChannel, InvalidGain};

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug)]
pub enum Error<SpiError, PinError> {
    /// The SPI bus could not be acquired or the transfer failed.
    Bus(SpiError),
    /// A control line (SCS, SYN, EN) could not be driven.
    Pin(PinError),
    /// Post-configuration read-back did not match what was written.
    Verification { expected: u32, read: u32 },
    /// Register access attempted while the device is not brought up.
    NotReady(BringUpState),
    /// Gain outside {2, 4, 8, 16}.
    InvalidGain(u8),
    /// Channel number outside {1, 2}.
    InvalidChannel(u8),
    /// Scaling constants or timings that cannot work.
    InvalidConfig,
    /// Operation not offered by the device (e.g. writing a measurement endpoint).
    Unsupported,
}

impl<SpiError, PinError> From<InvalidGain> for Error<SpiError, PinError> {
    fn from(e: InvalidGain) -> Self {
        Error::InvalidGain(e.0)
    }
}

impl<SpiError, PinError> From<InvalidChannel> for Error<SpiError, PinError> {
    fn from(e: InvalidChannel) -> Self {
        Error::InvalidChannel(e.0)
    }
}

impl<SpiError: core::fmt::Debug, PinError: core::fmt::Debug> core::fmt::Display
    for Error<SpiError, PinError>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "SPI error: {:?}", e),
            Error::Pin(e) => write!(f, "control line error: {:?}", e),
            Error::Verification { expected, read } => write!(
                f,
                "configuration read-back mismatch: wrote {:#010x}, read {:#010x}",
                expected, read
            ),
            Error::NotReady(state) => write!(f, "device not ready (state {:?})", state),
            Error::InvalidGain(g) => write!(f, "unsupported gain x{}", g),
            Error::InvalidChannel(c) => write!(f, "no channel {}", c),
            Error::InvalidConfig => write!(f, "invalid configuration"),
            Error::Unsupported => write!(f, "operation not supported"),
        }
    }
}
