use byteorder::{ByteOrder, LittleEndian};
use core::ops::Deref;

/// The 9 bytes a device returns for a read scratchpad command
///
/// | Byte | Content |
/// |------|---------|
/// | 0 | Temperature LSB |
/// | 1 | Temperature MSB |
/// | 2-3 | Alarm limits |
/// | 4 | Configuration |
/// | 5-7 | Reserved |
/// | 8 | CRC |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scratchpad {
    raw: [u8; Self::BYTES],
}

impl Scratchpad {
    pub const BYTES: usize = 9;

    /// Low and high byte of the temperature, as read
    pub fn temperature_bytes(&self) -> (u8, u8) {
        (self.raw[0], self.raw[1])
    }

    /// Signed temperature in 1/16 °C
    pub fn raw_temperature(&self) -> i16 {
        LittleEndian::read_i16(&self.raw[0..2])
    }
}

impl From<[u8; Scratchpad::BYTES]> for Scratchpad {
    fn from(raw: [u8; Scratchpad::BYTES]) -> Self {
        Scratchpad { raw }
    }
}

impl Deref for Scratchpad {
    type Target = [u8; Scratchpad::BYTES];

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}
