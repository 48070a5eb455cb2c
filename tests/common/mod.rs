//! Simulated STPM3x for behavioural tests.
//!
//! The simulated chip speaks the 5-byte SPI protocol (answers a read request on the
//! following frame, applies half-word writes, self-clears latch/reset bits and
//! clears status bits written as 1) and logs every pin edge and frame.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, SpiBus};
use stpm3x_rs::checksum::checksum;
use stpm3x_rs::driver::{ControlLines, Stpm3x};
use stpm3x_rs::frame::{encode_response, FILL, FRAME_LEN};
use stpm3x_rs::registers::{DspCr3Bits, Register};
use stpm3x_rs::Config;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Line {
    Scs,
    Syn,
    En,
}

/// Everything the driver did to the chip, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Pin { line: Line, high: bool },
    Write { address: u8, value: u16 },
    ReadRequest { address: u8 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimError;

impl digital::Error for SimError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

impl spi::Error for SimError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

#[derive(Debug, Default)]
pub struct ChipState {
    /// 32-bit registers keyed by their (even) address.
    registers: HashMap<u8, u32>,
    /// Value clocked out on the next frame.
    pending: u32,
    pub events: Vec<Event>,
    pub selected: bool,
    pub elapsed_us: u64,
    /// Frames clocked while SCS was high.
    pub unselected_frames: usize,
    /// Frames whose checksum the chip rejected.
    pub rejected_frames: usize,

    /// Required quiet time after a frame before the next frame or an SCS edge.
    pub min_gap_us: u64,
    /// A transfer returned but was not flushed yet.
    in_flight: bool,
    /// Time since the last flush, while no frame or SCS edge followed it.
    quiet_us: Option<u64>,
    /// Delays spent while a frame could still be shifting.
    pub delays_before_flush: usize,
    /// Frames or SCS edges that came too soon after the previous frame.
    pub gap_violations: usize,

    /// Reads of these addresses return a fixed value.
    pub stuck: HashMap<u8, u32>,
    /// Flip the checksum of every answer.
    pub corrupt_answers: bool,
    pub fail_pin: Option<Line>,
    pub fail_bus: bool,
}

impl ChipState {
    fn new() -> Self {
        let mut state = Self::default();
        state.registers.insert(Register::DSP_CR3.addr(), 0x0000_04E0);
        state.registers.insert(Register::US_REG1.addr(), 0x0000_4007);
        state
    }

    pub fn register(&self, reg: Register) -> u32 {
        self.registers.get(&reg.addr()).copied().unwrap_or(0)
    }

    pub fn set_register(&mut self, reg: Register, value: u32) {
        self.registers.insert(reg.addr(), value);
    }

    /// Half-word writes in the order they arrived.
    pub fn writes(&self) -> Vec<(u8, u16)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Write { address, value } => Some((*address, *value)),
                _ => None,
            })
            .collect()
    }

    /// Frame events only, without pin edges.
    pub fn frames(&self) -> Vec<Event> {
        self.events
            .iter()
            .filter(|e| !matches!(e, Event::Pin { .. }))
            .cloned()
            .collect()
    }

    pub fn read_requests(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::ReadRequest { address } => Some(*address),
                _ => None,
            })
            .collect()
    }

    fn apply_write(&mut self, address: u8, value: u16) {
        let reg = address & !1;
        let shift = if address & 1 == 1 { 16 } else { 0 };
        let bits = (value as u32) << shift;
        let mask = 0xFFFFu32 << shift;
        let current = self.registers.get(&reg).copied().unwrap_or(0);
        let mut next = if reg == Register::DSP_SR1.addr() || reg == Register::DSP_SR2.addr() {
            current & !bits
        } else {
            (current & !mask) | bits
        };
        if reg == Register::DSP_CR3.addr() {
            let self_clearing = DspCr3Bits::SW_RESET | DspCr3Bits::SW_LATCH1 | DspCr3Bits::SW_LATCH2;
            next &= !self_clearing.bits();
        }
        self.registers.insert(reg, next);
    }

    /// Anything that must not happen before the previous frame settled.
    fn check_gap(&mut self) {
        if self.in_flight || self.quiet_us.map_or(false, |q| q < self.min_gap_us) {
            self.gap_violations += 1;
        }
        self.in_flight = false;
        self.quiet_us = None;
    }

    fn wait(&mut self, us: u64) {
        if self.in_flight {
            self.delays_before_flush += 1;
        }
        if let Some(q) = self.quiet_us.as_mut() {
            *q += us;
        }
        self.elapsed_us += us;
    }

    fn clock_frame(&mut self, frame: &mut [u8]) {
        if !self.selected {
            self.unselected_frames += 1;
        }
        let mut answer = encode_response(self.pending);
        if self.corrupt_answers {
            answer[FRAME_LEN - 1] ^= 0xFF;
        }
        let payload = [frame[0], frame[1], frame[2], frame[3]];
        let accepted = checksum(&payload) == frame[4];
        if accepted {
            if payload[1] != FILL {
                let value = u16::from_le_bytes([payload[2], payload[3]]);
                self.events.push(Event::Write {
                    address: payload[1],
                    value,
                });
                self.apply_write(payload[1], value);
            }
            if payload[0] != FILL {
                let address = payload[0];
                self.events.push(Event::ReadRequest { address });
                self.pending = match self.stuck.get(&address) {
                    Some(v) => *v,
                    None => self.registers.get(&address).copied().unwrap_or(0),
                };
            }
        } else {
            self.rejected_frames += 1;
        }
        frame.copy_from_slice(&answer);
    }
}

pub type Shared = Rc<RefCell<ChipState>>;

pub struct SimBus {
    chip: Shared,
}

impl spi::ErrorType for SimBus {
    type Error = SimError;
}

impl SpiBus for SimBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), SimError> {
        words.fill(FILL);
        self.transfer_in_place(words)
    }

    fn write(&mut self, words: &[u8]) -> Result<(), SimError> {
        let mut buf = words.to_vec();
        self.transfer_in_place(&mut buf)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), SimError> {
        let mut buf = write.to_vec();
        self.transfer_in_place(&mut buf)?;
        let n = read.len().min(buf.len());
        read[..n].copy_from_slice(&buf[..n]);
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), SimError> {
        let mut chip = self.chip.borrow_mut();
        if chip.fail_bus {
            return Err(SimError);
        }
        chip.check_gap();
        chip.in_flight = true;
        for frame in words.chunks_mut(FRAME_LEN) {
            if frame.len() == FRAME_LEN {
                chip.clock_frame(frame);
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SimError> {
        let mut chip = self.chip.borrow_mut();
        if chip.in_flight {
            chip.in_flight = false;
            chip.quiet_us = Some(0);
        }
        Ok(())
    }
}

pub struct SimPin {
    line: Line,
    chip: Shared,
}

impl SimPin {
    fn set(&mut self, high: bool) -> Result<(), SimError> {
        let mut chip = self.chip.borrow_mut();
        if chip.fail_pin == Some(self.line) {
            return Err(SimError);
        }
        if self.line == Line::Scs {
            chip.check_gap();
            chip.selected = !high;
        }
        chip.events.push(Event::Pin { line: self.line, high });
        Ok(())
    }
}

impl digital::ErrorType for SimPin {
    type Error = SimError;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), SimError> {
        self.set(false)
    }

    fn set_high(&mut self) -> Result<(), SimError> {
        self.set(true)
    }
}

pub struct SimDelay {
    chip: Shared,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.chip.borrow_mut().wait((ns / 1_000) as u64);
    }

    fn delay_us(&mut self, us: u32) {
        self.chip.borrow_mut().wait(us as u64);
    }
}

pub type SimDriver = Stpm3x<SimBus, SimPin, SimDelay>;

/// A driver wired to a fresh simulated chip with SCS, SYN and EN connected.
pub fn sim_driver(config: Config) -> (SimDriver, Shared) {
    let chip: Shared = Rc::new(RefCell::new(ChipState::new()));
    chip.borrow_mut().min_gap_us = config.timings.t_scs_us as u64;
    let pin = |line| SimPin {
        line,
        chip: chip.clone(),
    };
    let lines = ControlLines {
        scs: pin(Line::Scs),
        syn: pin(Line::Syn),
        en: Some(pin(Line::En)),
    };
    let driver = Stpm3x::new(
        SimBus { chip: chip.clone() },
        lines,
        SimDelay { chip: chip.clone() },
        config,
    )
    .unwrap();
    (driver, chip)
}

/// A simulated driver that already completed bring-up, with the event log cleared.
pub fn ready_driver(config: Config) -> (SimDriver, Shared) {
    let (mut driver, chip) = sim_driver(config);
    driver.bring_up().unwrap();
    chip.borrow_mut().events.clear();
    (driver, chip)
}
