//! 5-byte SPI frame encoding and decoding.
//!
//! Every exchange with the chip is full duplex and exactly five bytes long:
//! `[read address, write address, data lsb, data msb, crc]` going out and
//! `[b0, b1, b2, b3, crc]` coming back. The chip answers a read request one
//! frame later, so a register read is always a pair of frames.

use crate::checksum::checksum;

/// Length of one frame on the wire.
pub const FRAME_LEN: usize = 5;

/// Address byte meaning "no read" / "no write".
pub const FILL: u8 = 0xFF;

/// An outgoing frame whose last byte is always the checksum of the first four.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    fn seal(payload: [u8; 4]) -> Self {
        let [b0, b1, b2, b3] = payload;
        Self([b0, b1, b2, b3, checksum(&payload)])
    }

    /// Write one 16-bit half-word at `address` (`address + 1` selects the upper half of a register).
    pub fn write(address: u8, value: u16) -> Self {
        let [lo, hi] = value.to_le_bytes();
        Self::seal([FILL, address, lo, hi])
    }

    /// Ask the chip to return the register at `address` on the next exchange.
    pub fn read_request(address: u8) -> Self {
        Self::seal([address, FILL, FILL, FILL])
    }

    /// Clock out the value requested by the previous frame without starting a new request.
    pub fn read_continue() -> Self {
        Self::seal([FILL; 4])
    }

    /// A frame that neither reads nor writes; flushes a pending answer out of the chip.
    pub fn idle() -> Self {
        Self::read_continue()
    }

    /// Raw bytes as they go on the wire.
    pub fn bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Checksum byte.
    pub fn crc(&self) -> u8 {
        self.0[FRAME_LEN - 1]
    }
}

/// Outcome of validating the checksum of a received frame.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChecksumStatus {
    Valid,
    /// The chip does not retransmit; the value is still handed out and the caller decides.
    Mismatch { expected: u8, received: u8 },
}

impl ChecksumStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, ChecksumStatus::Valid)
    }
}

/// A decoded 32-bit register value together with its checksum verdict.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Response {
    pub value: u32,
    pub checksum: ChecksumStatus,
}

/// Assemble the register value carried by a received frame (little-endian in bytes 0..=3).
pub fn decode_response(rx: &[u8; FRAME_LEN]) -> Response {
    let payload = [rx[0], rx[1], rx[2], rx[3]];
    let expected = checksum(&payload);
    let received = rx[FRAME_LEN - 1];
    let checksum = if expected == received {
        ChecksumStatus::Valid
    } else {
        ChecksumStatus::Mismatch { expected, received }
    };
    Response {
        value: u32::from_le_bytes(payload),
        checksum,
    }
}

/// Build the frame the chip would send back for `value`. Handy for simulators and tests.
pub fn encode_response(value: u32) -> [u8; FRAME_LEN] {
    let payload = value.to_le_bytes();
    let [b0, b1, b2, b3] = payload;
    [b0, b1, b2, b3, checksum(&payload)]
}

/// Split a register into its (low, high) half-words, in the order they are written.
pub fn split_register(value: u32) -> (u16, u16) {
    ((value & 0xFFFF) as u16, (value >> 16) as u16)
}

/// Inverse of [`split_register`].
pub fn join_half_words(low: u16, high: u16) -> u32 {
    (high as u32) << 16 | low as u32
}
