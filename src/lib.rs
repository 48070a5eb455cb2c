//! STPM32/33/34 Rust Driver
//!
//! `no_std` driver for the ST STPM3x metering front ends over SPI: 5-byte CRC-sealed
//! frames, the timed reset/configuration bring-up, and RMS voltage/current decoding.
//! Blocking APIs use `embedded-hal` 1; the `async` feature adds `_async` twins on
//! `embedded-hal-async`, and `defmt` enables logging and `defmt::Format` derives.

#![no_std]

pub mod bringup;
pub mod calibration;
pub mod checksum;
pub mod data_types;
pub mod driver;
pub mod error;
pub mod frame;
pub mod interrupt;
pub mod measurement;
pub mod registers;
pub mod sensor;

pub use data_types::{BringUpState, Channel, ChannelReading, Config, CurrentGain, Measurement, Unit};
pub use driver::{ControlLines, Stpm3x, SPI_MODE};
pub use error::Error;
pub use interrupt::{IrqQueue, IrqSource};
pub use registers::Register;
pub use sensor::{Endpoint, ENDPOINTS};
