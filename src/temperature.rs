use core::fmt::{Display, Formatter, Result as FmtResult};

/// A reading in the device's fixed point format, 1/16 °C per unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Temperature(pub i16);

impl Temperature {
    pub fn from_bytes(lo: u8, hi: u8) -> Self {
        Temperature(i16::from_le_bytes([lo, hi]))
    }

    /// Splits into whole degrees and fraction in 1/10000 degree, both carrying the sign
    pub fn split(&self) -> (i16, i16) {
        let raw = i32::from(self.0);
        let abs = raw.abs();
        let (int, frac) = ((abs >> 4) as i16, ((abs & 0xF) * 625) as i16);
        if raw < 0 {
            (-int, -frac)
        } else {
            (int, frac)
        }
    }

    /// Degrees Fahrenheit in the same 1/16 degree fixed point
    pub fn fahrenheit(&self) -> i32 {
        i32::from(self.0) * 9 / 5 + 32 * 16
    }

    pub fn celsius(&self) -> f32 {
        f32::from(self.0) / 16_f32
    }
}

impl Display for Temperature {
    /// Signed degrees with four decimals, e.g. `-10.1250`
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let (int, frac) = self.split();
        let sign = if self.0 < 0 { "-" } else { "+" };
        write!(f, "{}{}.{:04}", sign, int.abs(), frac.abs())
    }
}
