//! Simulated bus for tests: a shared microsecond clock advanced by [`SimDelay`],
//! an open-drain line and any number of devices reacting to the slots the master
//! produces on it.

extern crate std;

use crate::{Identifier, IoWire};
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use std::{cell::RefCell, rc::Rc, vec::Vec};

/// Low pulses at least this long reset every device
const RESET_MIN_NS: u64 = 400_000;
/// Low pulses shorter than this are a written 1 (or a read slot)
const WRITE_ONE_MAX_NS: u64 = 15_000;
/// How long a device holds the line low when sending a 0
const TX_HOLD_NS: u64 = 45_000;
const PRESENCE_DELAY_NS: u64 = 15_000;
const PRESENCE_END_NS: u64 = 240_000;

/// Power-on scratchpad: 85 °C, alarm limits, 12 bit config, reserved bytes, crc
const POWER_ON_SCRATCHPAD: [u8; 9] = [0x50, 0x05, 0x4b, 0x46, 0x7f, 0xff, 0x0c, 0x10, 0x1c];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Driven,
    Released,
}

/// A low pulse the master produced, in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub start: u64,
    pub width: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Rom { value: u8, bits: u8 },
    Search { index: u8, step: u8 },
    Match { index: u8 },
    SendRom { index: u8 },
    Function { value: u8, bits: u8 },
    Converting { remaining: u32 },
    SendScratchpad { index: u8 },
    EchoReceive { value: u8, bits: u8 },
    EchoSend { value: u8, bits: u8 },
}

/// A temperature device on the simulated bus
#[derive(Debug, Clone)]
pub struct SimDevice {
    rom: Identifier,
    temperature: i16,
    conversion_slots: u32,
    scratchpad: [u8; 9],
    phase: Phase,
    pull_until: u64,
    presence: Option<(u64, u64)>,
}

impl SimDevice {
    pub fn new(rom: [u8; 8]) -> Self {
        SimDevice {
            rom: Identifier::from(rom),
            temperature: 0x0191,
            conversion_slots: 3,
            scratchpad: POWER_ON_SCRATCHPAD,
            phase: Phase::Idle,
            pull_until: 0,
            presence: None,
        }
    }

    /// Raw reading, 1/16 °C
    pub fn with_temperature(mut self, raw: i16) -> Self {
        self.temperature = raw;
        self
    }

    /// Number of read slots the device reports busy after a convert command
    pub fn with_conversion_slots(mut self, slots: u32) -> Self {
        self.conversion_slots = slots;
        self
    }

    fn echo() -> Self {
        SimDevice {
            phase: Phase::EchoReceive { value: 0, bits: 0 },
            ..SimDevice::new([0; 8])
        }
    }

    fn reset(&mut self, now: u64) {
        if !matches!(
            self.phase,
            Phase::EchoReceive { .. } | Phase::EchoSend { .. }
        ) {
            self.phase = Phase::Rom { value: 0, bits: 0 };
            self.presence = Some((now + PRESENCE_DELAY_NS, now + PRESENCE_END_NS));
        }
        self.pull_until = 0;
    }

    /// The bit this device puts on the bus in the slot starting now, if any
    fn transmit(&self) -> Option<bool> {
        match self.phase {
            Phase::Search { index, step: 0 } => Some(self.rom.bit(index)),
            Phase::Search { index, step: 1 } => Some(!self.rom.bit(index)),
            Phase::SendRom { index } => Some(self.rom.bit(index)),
            Phase::Converting { remaining } => Some(remaining == 0),
            Phase::SendScratchpad { index } => {
                let index = index as usize;
                Some(self.scratchpad[index / 8] & (1 << (index % 8)) != 0)
            }
            Phase::EchoSend { value, bits } => Some(value & (1 << bits) != 0),
            _ => None,
        }
    }

    fn slot_start(&mut self, now: u64) {
        self.presence = None;
        if self.transmit() == Some(false) {
            self.pull_until = now + TX_HOLD_NS;
        }
    }

    fn slot(&mut self, bit: bool) {
        self.phase = match self.phase {
            Phase::Idle => Phase::Idle,
            Phase::Rom { value, bits } => {
                let value = value | (bit as u8) << bits;
                if bits < 7 {
                    Phase::Rom {
                        value,
                        bits: bits + 1,
                    }
                } else {
                    match value {
                        0xCC => Phase::Function { value: 0, bits: 0 },
                        0x55 => Phase::Match { index: 0 },
                        0xF0 => Phase::Search { index: 0, step: 0 },
                        0x33 => Phase::SendRom { index: 0 },
                        _ => Phase::Idle,
                    }
                }
            }
            Phase::Search { index, step } if step < 2 => Phase::Search {
                index,
                step: step + 1,
            },
            Phase::Search { index, .. } => {
                if bit != self.rom.bit(index) {
                    Phase::Idle
                } else if index + 1 == Identifier::BITS {
                    Phase::Function { value: 0, bits: 0 }
                } else {
                    Phase::Search {
                        index: index + 1,
                        step: 0,
                    }
                }
            }
            Phase::Match { index } => {
                if bit != self.rom.bit(index) {
                    Phase::Idle
                } else if index + 1 == Identifier::BITS {
                    Phase::Function { value: 0, bits: 0 }
                } else {
                    Phase::Match { index: index + 1 }
                }
            }
            Phase::SendRom { index } if index + 1 == Identifier::BITS => {
                Phase::Function { value: 0, bits: 0 }
            }
            Phase::SendRom { index } => Phase::SendRom { index: index + 1 },
            Phase::Function { value, bits } => {
                let value = value | (bit as u8) << bits;
                if bits < 7 {
                    Phase::Function {
                        value,
                        bits: bits + 1,
                    }
                } else {
                    match value {
                        0x44 => {
                            if self.conversion_slots == 0 {
                                self.latch_temperature();
                            }
                            Phase::Converting {
                                remaining: self.conversion_slots,
                            }
                        }
                        0xBE => Phase::SendScratchpad { index: 0 },
                        _ => Phase::Idle,
                    }
                }
            }
            Phase::Converting { remaining: 0 } => Phase::Converting { remaining: 0 },
            Phase::Converting { remaining } => {
                if remaining == 1 {
                    self.latch_temperature();
                }
                Phase::Converting {
                    remaining: remaining - 1,
                }
            }
            Phase::SendScratchpad { index } if index + 1 == 72 => Phase::Idle,
            Phase::SendScratchpad { index } => Phase::SendScratchpad { index: index + 1 },
            Phase::EchoReceive { value, bits } => {
                let value = value | (bit as u8) << bits;
                if bits < 7 {
                    Phase::EchoReceive {
                        value,
                        bits: bits + 1,
                    }
                } else {
                    Phase::EchoSend { value, bits: 0 }
                }
            }
            Phase::EchoSend { value, bits } => {
                if bits < 7 {
                    Phase::EchoSend {
                        value,
                        bits: bits + 1,
                    }
                } else {
                    Phase::EchoReceive { value: 0, bits: 0 }
                }
            }
        };
    }

    fn latch_temperature(&mut self) {
        self.scratchpad[..2].copy_from_slice(&self.temperature.to_le_bytes());
    }

    fn pulls_low(&self, now: u64) -> bool {
        now < self.pull_until
            || self
                .presence
                .is_some_and(|(from, until)| from <= now && now < until)
    }
}

struct State {
    now: u64,
    line: Line,
    low_since: u64,
    pulses: Vec<Pulse>,
    devices: Vec<SimDevice>,
    held_low: bool,
    disconnect_after: Option<usize>,
    detach_after: Option<(Identifier, usize)>,
}

impl State {
    fn slot(&mut self, bit: bool) {
        if let Some(left) = self.disconnect_after.as_mut() {
            if *left == 0 {
                self.devices.clear();
            } else {
                *left -= 1;
            }
        }
        if let Some((rom, left)) = self.detach_after.as_mut() {
            if *left == 0 {
                let rom = *rom;
                self.devices.retain(|device| device.rom != rom);
            } else {
                *left -= 1;
            }
        }
        for device in self.devices.iter_mut() {
            device.slot(bit);
        }
    }
}

#[derive(Clone)]
pub struct SimBus(Rc<RefCell<State>>);

impl SimBus {
    /// A bus with a pull-up and nothing attached
    pub fn new() -> Self {
        SimBus(Rc::new(RefCell::new(State {
            now: 0,
            line: Line::Released,
            low_since: 0,
            pulses: Vec::new(),
            devices: Vec::new(),
            held_low: false,
            disconnect_after: None,
            detach_after: None,
        })))
    }

    /// A bus whose single responder sends every written byte back on the next eight read slots
    pub fn loopback() -> Self {
        let bus = Self::new();
        bus.attach_device(SimDevice::echo());
        bus
    }

    pub fn attach(&self, rom: [u8; 8]) {
        self.attach_device(SimDevice::new(rom));
    }

    pub fn attach_device(&self, device: SimDevice) {
        self.0.borrow_mut().devices.push(device);
    }

    /// A bus with nothing attached and no pull-up, so the released line never rises
    pub fn without_pull_up() -> Self {
        let bus = Self::new();
        bus.0.borrow_mut().held_low = true;
        bus
    }

    /// Holds the line low permanently
    pub fn short(&self) {
        self.0.borrow_mut().held_low = true;
    }

    /// Every device vanishes once `slots` more slots have passed
    pub fn disconnect_after(&self, slots: usize) {
        self.0.borrow_mut().disconnect_after = Some(slots);
    }

    /// The device with identifier `rom` vanishes once `slots` more slots have passed
    pub fn detach_after(&self, rom: [u8; 8], slots: usize) {
        self.0.borrow_mut().detach_after = Some((Identifier::from(rom), slots));
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay(self.0.clone())
    }

    pub fn low_pulses(&self) -> Vec<Pulse> {
        self.0.borrow().pulses.clone()
    }

    pub fn clear_pulses(&self) {
        self.0.borrow_mut().pulses.clear();
    }

    /// Microseconds since the bus was created
    pub fn now(&self) -> u64 {
        self.0.borrow().now / 1000
    }

    pub fn line(&self) -> Line {
        self.0.borrow().line
    }
}

impl IoWire for SimBus {
    type Error = Infallible;

    fn drive_low(&mut self) -> Result<(), Self::Error> {
        let state = &mut *self.0.borrow_mut();
        if state.line == Line::Released {
            let now = state.now;
            state.line = Line::Driven;
            state.low_since = now;
            for device in state.devices.iter_mut() {
                device.slot_start(now);
            }
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        let state = &mut *self.0.borrow_mut();
        if state.line == Line::Driven {
            let now = state.now;
            let width = now - state.low_since;
            state.line = Line::Released;
            state.pulses.push(Pulse {
                start: state.low_since / 1000,
                width: width / 1000,
            });
            if width >= RESET_MIN_NS {
                for device in state.devices.iter_mut() {
                    device.reset(now);
                }
            } else {
                state.slot(width < WRITE_ONE_MAX_NS);
            }
        }
        Ok(())
    }

    fn sample(&mut self) -> Result<bool, Self::Error> {
        let state = self.0.borrow();
        let now = state.now;
        let pulled = state.held_low
            || state.line == Line::Driven
            || state.devices.iter().any(|d| d.pulls_low(now));
        Ok(!pulled)
    }
}

/// Delay source advancing the clock of a [`SimBus`]
pub struct SimDelay(Rc<RefCell<State>>);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().now += u64::from(ns);
    }
}
