use crate::{Driver, Error, IoWire, RomCommand};
use core::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    ops::Deref,
    str::FromStr,
};
use embedded_hal::delay::DelayNs;

/// The unique 64 bit identifier of a device, in the order it travels on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Identifier {
    raw: [u8; Self::BYTES],
}

impl From<[u8; Identifier::BYTES]> for Identifier {
    fn from(raw: [u8; Identifier::BYTES]) -> Self {
        Identifier { raw }
    }
}

impl From<Identifier> for [u8; Identifier::BYTES] {
    fn from(id: Identifier) -> [u8; Identifier::BYTES] {
        id.raw
    }
}

impl From<u64> for Identifier {
    /// Byte 0 of the identifier is the least significant byte of `value`
    fn from(value: u64) -> Self {
        Identifier {
            raw: value.to_le_bytes(),
        }
    }
}

impl From<Identifier> for u64 {
    fn from(id: Identifier) -> u64 {
        u64::from_le_bytes(id.raw)
    }
}

impl Deref for Identifier {
    type Target = [u8; Identifier::BYTES];

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

impl AsRef<[u8]> for Identifier {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

impl Identifier {
    /// The length of an identifier in bytes
    pub const BYTES: usize = 8;

    /// The length of an identifier in bits
    pub const BITS: u8 = Self::BYTES as u8 * 8;

    pub fn family_code(&self) -> u8 {
        self.raw[0]
    }

    /// Bit `index` in transmission order, i.e. bit `index % 8` of byte `index / 8`
    pub fn bit(&self, index: u8) -> bool {
        let index = index as usize;
        self.raw[index / 8] & (0x01 << (index % 8)) != 0x00
    }

    pub(crate) fn set_bit(&mut self, index: u8, value: bool) {
        let index = index as usize;
        let mask = 0x01 << (index % 8);
        if value {
            self.raw[index / 8] |= mask;
        } else {
            self.raw[index / 8] &= !mask;
        }
    }

    /// Reads the identifier of the only device on a single-drop bus
    ///
    /// With more than one device attached the answers collide and the result is meaningless.
    pub fn read_single<W: IoWire>(
        driver: &mut Driver<W>,
        delay: &mut impl DelayNs,
    ) -> Result<Self, Error<W::Error>> {
        let mut id = Self::default();
        driver.reset(delay)?;
        driver.write_command(delay, RomCommand::ReadRom)?;
        driver.read_bytes(delay, &mut id.raw)?;
        Ok(id)
    }
}

/// Error type
#[derive(Debug, PartialEq, Eq)]
pub enum IdentifierError {
    NotEnough,
    Invalid,
}

fn hex_to_u8(c: char) -> Option<u8> {
    c.to_digit(16).map(|d| d as u8)
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut id = Identifier::default();
        let mut chars = s.chars().filter(|c| !c.is_whitespace() && *c != ':');

        for byte in id.raw.iter_mut() {
            match (chars.next(), chars.next()) {
                (Some(h), Some(l)) => match (hex_to_u8(h), hex_to_u8(l)) {
                    (Some(h), Some(l)) => *byte = (h << 4) | l,
                    _ => return Err(IdentifierError::Invalid),
                },
                _ => return Err(IdentifierError::NotEnough),
            }
        }
        if chars.next().is_some() {
            return Err(IdentifierError::Invalid);
        }

        Ok(id)
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self[0], self[1], self[2], self[3], self[4], self[5], self[6], self[7],
        )
    }
}
