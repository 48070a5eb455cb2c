//! CRC-8 used to seal every 5-byte SPI frame.
//!
//! The STPM3x computes its checksum over the first four bytes of a frame, MSB first,
//! with generator polynomial 0x07 and a zero seed (UM2066 "Getting started with the STPM3x").
//! That is exactly the CRC-8/SMBUS catalogue entry, so the `crc` crate table is used.

use crc::{CRC_8_SMBUS, Crc};

/// Generator polynomial programmed into US_REG1 (`CRC_POLYNOMIAL` field).
pub const CRC_POLYNOMIAL: u8 = 0x07;

const CRC_STPM: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Checksum of a frame payload (bytes 0..=3 of a frame).
pub fn checksum(bytes: &[u8; 4]) -> u8 {
    CRC_STPM.checksum(bytes)
}
