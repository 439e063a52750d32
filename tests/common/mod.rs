//! A simulated SHT1x on the far end of the two lines.
//!
//! `FakeSht1x` implements `LineControl` and reacts to clock and data edges the way the sensor
//! does: it recognises starts and connection resets, shifts in command bytes, acknowledges
//! them, converts, and shifts out its reply. Everything it sees is recorded so tests can check
//! what went over the wire.
#![allow(dead_code)]

use core::convert::Infallible;

use embedded_hal::digital::PinState;
use sht1x_driver::{Acknowledge, Direction, LineControl};

/// How the simulated sensor behaves.
#[derive(Debug, Clone)]
pub struct Behaviour {
    /// Pull DATA low on the ninth clock after each byte received.
    pub acknowledge: bool,
    /// Polls of DATA before a measurement is ready. `None` never finishes.
    pub ready_after_polls: Option<u32>,
    /// Reply to MeasureHumidity: MSB, LSB, checksum.
    pub humidity: [u8; 3],
    /// Reply to MeasureTemperature: MSB, LSB, checksum.
    pub temperature: [u8; 3],
}

impl Default for Behaviour {
    fn default() -> Self {
        Behaviour {
            acknowledge: true,
            ready_after_polls: Some(3),
            humidity: reply(0x05, 0x05, 0x86, 0),
            temperature: reply(0x03, 0x19, 0xc8, 0),
        }
    }
}

/// Build a measurement reply with a correct checksum.
pub fn reply(command: u8, msb: u8, lsb: u8, status: u8) -> [u8; 3] {
    [msb, lsb, crc(status, &[command, msb, lsb])]
}

/// The SHT1x CRC, bit by bit: polynomial 0x31, seeded with the reversed low nibble of the
/// status register, sent reversed.
pub fn crc(status: u8, bytes: &[u8]) -> u8 {
    let mut crc = (status & 0x0f).reverse_bits();
    for byte in bytes {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ 0x31 } else { crc << 1 };
        }
    }
    crc.reverse_bits()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Command,
    StatusRegister,
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Idle,
    // DATA went low with SCK high, waiting for it to rise again to complete the start.
    Starting,
    Receiving { value: u8, bits: u8, target: Target },
    Acknowledging { value: u8, target: Target },
    Converting { polls_left: Option<u32>, reply: [u8; 3] },
    Sending { reply: [u8; 3], len: usize, byte: usize, bit: u8, ready: bool, ack: Acknowledge },
}

pub struct FakeSht1x {
    pub behaviour: Behaviour,
    pub status: u8,

    clock: PinState,
    latch: PinState,
    direction: Direction,
    state: State,
    high_run: usize,

    /// Rising edges on SCK.
    pub rising_edges: usize,
    /// Transmission starts seen.
    pub starts: usize,
    /// Connection resets seen, counted when the start that ends them arrives.
    pub resets: usize,
    /// Soft reset commands executed.
    pub soft_resets: usize,
    /// Every byte received from the controller.
    pub received: Vec<u8>,
    /// DATA as sampled on each rising edge while receiving a byte.
    pub sampled: Vec<PinState>,
    /// The controller's answer after each byte sent.
    pub controller_acks: Vec<Acknowledge>,
    /// Reads of DATA, for any reason.
    pub polls: u32,
}

impl FakeSht1x {
    pub fn new(behaviour: Behaviour) -> Self {
        FakeSht1x {
            behaviour,
            status: 0,
            clock: PinState::Low,
            latch: PinState::High,
            direction: Direction::Input,
            state: State::Idle,
            high_run: 0,
            rising_edges: 0,
            starts: 0,
            resets: 0,
            soft_resets: 0,
            received: Vec::new(),
            sampled: Vec::new(),
            controller_acks: Vec::new(),
            polls: 0,
        }
    }

    /// Is the sensor pulling DATA low?
    fn sensor_low(&self) -> bool {
        match &self.state {
            State::Acknowledging { .. } => self.behaviour.acknowledge,
            State::Sending {
                reply, byte, bit, ready, ..
            } => {
                if *ready {
                    true
                } else if *bit < 8 {
                    reply[*byte] & (0x80 >> bit) == 0
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// DATA is an open-drain line, it is high unless someone pulls it low.
    fn wire(&self) -> bool {
        let controller_high = self.direction == Direction::Input || self.latch == PinState::High;
        controller_high && !self.sensor_low()
    }

    fn controller_data_changed(&mut self, before: bool) {
        let after = self.wire();
        if self.clock == PinState::Low || before == after {
            return;
        }

        if before {
            if self.high_run >= 9 {
                self.resets += 1;
            }
            self.high_run = 0;
            self.state = State::Starting;
        } else if self.state == State::Starting {
            self.starts += 1;
            self.state = State::Receiving {
                value: 0,
                bits: 0,
                target: Target::Command,
            };
        }
    }

    fn rising(&mut self) {
        self.rising_edges += 1;
        let high = self.wire();

        // Only clocks with the controller driving DATA high count towards a reset.
        if high && self.direction == Direction::Output && self.latch == PinState::High {
            self.high_run += 1;
            if self.high_run >= 9 {
                self.state = State::Idle;
            }
        } else {
            self.high_run = 0;
        }

        match &mut self.state {
            State::Receiving { value, bits, .. } if *bits < 8 => {
                *value = (*value << 1) | u8::from(high);
                *bits += 1;
                self.sampled.push(PinState::from(high));
            }
            State::Sending { bit, ready, ack, .. } => {
                *ready = false;
                if *bit == 8 {
                    *ack = Acknowledge::from(PinState::from(high));
                    self.controller_acks.push(*ack);
                }
            }
            _ => {}
        }
    }

    fn falling(&mut self) {
        match self.state.clone() {
            State::Receiving { value, bits: 8, target } => {
                self.received.push(value);
                self.state = State::Acknowledging { value, target };
            }
            State::Acknowledging { value, target } => match target {
                Target::Command => self.run_command(value),
                Target::StatusRegister => {
                    self.status = value;
                    self.state = State::Idle;
                }
            },
            State::Sending {
                reply,
                len,
                byte,
                bit,
                ready,
                ack,
            } => {
                if bit < 8 {
                    self.state = State::Sending {
                        reply,
                        len,
                        byte,
                        bit: bit + 1,
                        ready,
                        ack,
                    };
                } else if ack == Acknowledge::NoAck || byte + 1 == len {
                    self.state = State::Idle;
                } else {
                    self.state = State::Sending {
                        reply,
                        len,
                        byte: byte + 1,
                        bit: 0,
                        ready,
                        ack,
                    };
                }
            }
            _ => {}
        }
    }

    fn run_command(&mut self, command: u8) {
        self.state = match command {
            0x03 => State::Converting {
                polls_left: self.behaviour.ready_after_polls,
                reply: self.behaviour.temperature,
            },
            0x05 => State::Converting {
                polls_left: self.behaviour.ready_after_polls,
                reply: self.behaviour.humidity,
            },
            0x06 => State::Receiving {
                value: 0,
                bits: 0,
                target: Target::StatusRegister,
            },
            0x07 => State::Sending {
                reply: [self.status, crc(self.status, &[0x07, self.status]), 0],
                len: 2,
                byte: 0,
                bit: 0,
                ready: false,
                ack: Acknowledge::Ack,
            },
            0x1e => {
                self.status = 0;
                self.soft_resets += 1;
                State::Idle
            }
            _ => State::Idle,
        };
    }
}

impl LineControl for FakeSht1x {
    type Error = Infallible;

    fn set_clock(&mut self, level: PinState) -> Result<(), Infallible> {
        if level == self.clock {
            return Ok(());
        }
        self.clock = level;
        match level {
            PinState::High => self.rising(),
            PinState::Low => self.falling(),
        }
        Ok(())
    }

    fn set_data(&mut self, level: PinState) -> Result<(), Infallible> {
        let before = self.wire();
        self.latch = level;
        self.controller_data_changed(before);
        Ok(())
    }

    fn set_data_direction(&mut self, direction: Direction) -> Result<(), Infallible> {
        let before = self.wire();
        self.direction = direction;
        self.controller_data_changed(before);
        Ok(())
    }

    fn read_data(&mut self) -> Result<PinState, Infallible> {
        self.polls += 1;
        let finished = match &mut self.state {
            State::Converting {
                polls_left: Some(0),
                reply,
            } => Some(*reply),
            State::Converting {
                polls_left: Some(left),
                ..
            } => {
                *left -= 1;
                None
            }
            _ => None,
        };
        if let Some(reply) = finished {
            // Conversion done, DATA goes low until the first bit is clocked out.
            self.state = State::Sending {
                reply,
                len: 3,
                byte: 0,
                bit: 0,
                ready: true,
                ack: Acknowledge::Ack,
            };
        }
        Ok(PinState::from(self.wire()))
    }
}
