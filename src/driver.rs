use crate::{Error, Identifier, IoWire, OpCode, RomCommand, Timing};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use log::trace;

/// Bit and byte transport on top of a bus line.
///
/// Every timed primitive runs inside a critical section, so nothing can
/// preempt a slot halfway. Every primitive that pulls the line low releases it
/// again before returning, on error paths included.
pub struct Driver<W: IoWire> {
    io_wire: W,
    timing: Timing,
}

impl<E: Debug, W: IoWire<Error = E>> Driver<W> {
    pub fn new(io_wire: W) -> Self {
        Self::with_timing(io_wire, Timing::STANDARD)
    }

    pub fn with_timing(io_wire: W, timing: Timing) -> Self {
        Driver { io_wire, timing }
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Gives the bus line back, e.g. to reconfigure the pin
    pub fn into_inner(self) -> W {
        self.io_wire
    }

    /// Resets the bus and addresses every device on it
    pub fn reset_skip(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        self.reset(delay)?;
        self.skip(delay)?;
        Ok(())
    }

    /// Resets the bus and addresses a single device
    pub fn reset_select(
        &mut self,
        delay: &mut impl DelayNs,
        id: &Identifier,
    ) -> Result<(), Error<E>> {
        self.reset(delay)?;
        self.select(delay, id)?;
        Ok(())
    }

    pub fn skip(&mut self, delay: &mut impl DelayNs) -> Result<(), E> {
        self.write_command(delay, RomCommand::SkipRom)
    }

    pub fn select(&mut self, delay: &mut impl DelayNs, id: &Identifier) -> Result<(), E> {
        self.write_command(delay, RomCommand::MatchRom)?;
        self.write_bytes(delay, id.as_ref())
    }

    /// Performs a reset and listens for a presence pulse
    /// Returns Err(WireFault) if the wire does not rise before the pulse,
    /// Ok(()) if a presence pulse has been received and Err(NoPresence)
    /// if no device pulled the line low.
    pub fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        if !self.wire_rises(delay)? {
            return Err(Error::WireFault);
        }
        if self.presence_pulse(delay)? {
            Ok(())
        } else {
            Err(Error::NoPresence)
        }
    }

    /// Like [`Driver::reset`], but reports absence as `Ok(false)`
    ///
    /// A line that never rises (no pull-up, or shorted) cannot carry a presence
    /// pulse either, so it is reported as absence and no reset pulse is sent.
    pub fn reset_presence(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<E>> {
        if !self.wire_rises(delay)? {
            trace!("reset: line stays low");
            return Ok(false);
        }
        self.presence_pulse(delay)
    }

    fn presence_pulse(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<E>> {
        let timing = self.timing;
        let presence = critical_section::with(|_| -> Result<bool, E> {
            self.pulse_low(delay, timing.reset_low)?;
            delay.delay_us(timing.presence_sample);
            // a responder holds the line low during the sample window
            Ok(!self.io_wire.sample()?)
        })?;
        delay.delay_us(timing.reset_recovery);

        trace!("reset: presence {}", presence);
        Ok(presence)
    }

    /// Releases the line and waits up to `rise_timeout` for it to read high
    fn wire_rises(&mut self, delay: &mut impl DelayNs) -> Result<bool, E> {
        self.io_wire.release()?;
        for _ in 0..=self.timing.rise_timeout / 2 {
            if self.io_wire.sample()? {
                return Ok(true);
            }
            delay.delay_us(2);
        }
        Ok(false)
    }

    pub fn read_bytes(&mut self, delay: &mut impl DelayNs, dst: &mut [u8]) -> Result<(), E> {
        for d in dst {
            *d = self.read_byte(delay)?;
        }
        Ok(())
    }

    /// Reads eight bits, least significant first
    pub fn read_byte(&mut self, delay: &mut impl DelayNs) -> Result<u8, E> {
        critical_section::with(|_| -> Result<u8, E> {
            let mut byte = 0_u8;
            for _ in 0..8 {
                byte >>= 1;
                if self.read_bit(delay)? {
                    byte |= 0x80;
                }
            }
            Ok(byte)
        })
    }

    pub fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool, E> {
        let timing = self.timing;
        critical_section::with(|_| -> Result<bool, E> {
            self.pulse_low(delay, timing.read_low)?;
            delay.delay_us(timing.read_sample);
            let val = self.io_wire.sample()?;
            delay.delay_us(timing.read_recovery);
            Ok(val)
        })
    }

    pub fn write_command(&mut self, delay: &mut impl DelayNs, cmd: impl OpCode) -> Result<(), E> {
        self.write_byte(delay, cmd.op_code())
    }

    pub fn write_bytes(&mut self, delay: &mut impl DelayNs, bytes: &[u8]) -> Result<(), E> {
        for b in bytes {
            self.write_byte(delay, *b)?;
        }
        Ok(())
    }

    /// Writes eight bits, least significant first
    pub fn write_byte(&mut self, delay: &mut impl DelayNs, byte: u8) -> Result<(), E> {
        critical_section::with(|_| -> Result<(), E> {
            let mut byte = byte;
            for _ in 0..8 {
                self.write_bit(delay, (byte & 0x01) == 0x01)?;
                byte >>= 1;
            }
            Ok(())
        })
    }

    pub fn write_bit(&mut self, delay: &mut impl DelayNs, high: bool) -> Result<(), E> {
        let timing = self.timing;
        let low = if high {
            timing.write_one_low
        } else {
            timing.write_zero_low
        };
        critical_section::with(|_| -> Result<(), E> {
            self.pulse_low(delay, low)?;
            delay.delay_us(timing.write_slot.saturating_sub(low));
            Ok(())
        })
    }

    /// Pulls the line low for `low_us` and lets go, releasing even if driving failed
    fn pulse_low(&mut self, delay: &mut impl DelayNs, low_us: u32) -> Result<(), E> {
        let driven = self.io_wire.drive_low();
        if driven.is_ok() {
            delay.delay_us(low_us);
        }
        let released = self.io_wire.release();
        driven.and(released)
    }
}
