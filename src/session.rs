use crate::{
    Driver, Error, FunctionCommand, Identifier, IoWire, Registry, Scratchpad, SearchState,
    Temperature,
};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use log::{debug, warn};

/// Upper bound on search rounds in one discovery, against a bus that keeps
/// producing new garbage identifiers
const MAX_ROUNDS: usize = 1024;

/// How long [`Session::convert_and_read`] waits for a conversion to finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionWait {
    /// Give up once this much time has passed, in microseconds
    pub timeout_us: u32,
    /// Pause between two status reads, in microseconds
    pub poll_interval_us: u32,
}

impl ConversionWait {
    /// Maximum conversion time at 12 bit resolution
    pub const DEFAULT: ConversionWait = ConversionWait {
        timeout_us: 750_000,
        poll_interval_us: 1_000,
    };

    pub const fn with_timeout_ms(timeout_ms: u32) -> Self {
        ConversionWait {
            timeout_us: timeout_ms.saturating_mul(1000),
            ..Self::DEFAULT
        }
    }
}

impl Default for ConversionWait {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Outcome of [`Session::discover`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discovery {
    /// Distinct identifiers the search produced, retained or not
    pub found: usize,
    /// How many of them the registry could hold
    pub capacity: usize,
}

impl Discovery {
    pub fn retained(&self) -> usize {
        self.found.min(self.capacity)
    }

    pub fn is_truncated(&self) -> bool {
        self.found > self.capacity
    }

    /// Turns a truncated discovery into [`Error::CapacityExceeded`]
    pub fn check<E: Debug>(self) -> Result<usize, Error<E>> {
        if self.is_truncated() {
            Err(Error::CapacityExceeded {
                found: self.found,
                capacity: self.capacity,
            })
        } else {
            Ok(self.found)
        }
    }
}

/// Temperature conversions on one bus.
///
/// The session owns the bus for its whole lifetime, and every operation takes
/// `&mut self`, so a transaction can never interleave with another one. Hosts
/// sharing a session between threads should lock around whole operations.
pub struct Session<W: IoWire> {
    driver: Driver<W>,
    scratchpad: Scratchpad,
}

impl<E: Debug, W: IoWire<Error = E>> Session<W> {
    pub fn new(driver: Driver<W>) -> Self {
        Session {
            driver,
            scratchpad: Scratchpad::default(),
        }
    }

    pub fn driver(&mut self) -> &mut Driver<W> {
        &mut self.driver
    }

    pub fn into_driver(self) -> Driver<W> {
        self.driver
    }

    /// Enumerates the bus into `registry`, replacing its previous content.
    ///
    /// The search runs to completion even once the registry is full, so the
    /// result reports the real number of devices; only the first `N` are kept.
    pub fn discover<const N: usize>(
        &mut self,
        delay: &mut impl DelayNs,
        registry: &mut Registry<N>,
    ) -> Result<Discovery, Error<E>> {
        registry.clear();
        let mut search = SearchState::new();
        let mut found = 0;
        let mut previous = None;

        let mut next = self.driver.search_first(&mut search, delay)?;
        while let Some(id) = next {
            // a healthy bus never yields the same identifier twice in a row
            if previous == Some(id) {
                warn!("discover: {} seen twice, stopping", id);
                break;
            }
            previous = Some(id);
            match registry.insert(id) {
                Ok(true) => debug!("discover: found {}", id),
                Ok(false) => {
                    warn!("discover: {} seen twice, stopping", id);
                    break;
                }
                Err(id) => warn!("discover: registry full, dropping {}", id),
            }
            found += 1;
            if found >= MAX_ROUNDS {
                warn!("discover: giving up after {} rounds", found);
                break;
            }
            next = self.driver.search_next(&mut search, delay)?;
        }

        debug!("discover: {} devices", found);
        Ok(Discovery { found, capacity: N })
    }

    /// Runs a conversion on `target`, or on every device if `None`, and reads back the scratchpad.
    ///
    /// The stored scratchpad is only replaced once all 9 bytes arrived.
    pub fn convert_and_read(
        &mut self,
        delay: &mut impl DelayNs,
        target: Option<&Identifier>,
        wait: &ConversionWait,
    ) -> Result<&Scratchpad, Error<E>> {
        self.address(delay, target)?;
        self.driver
            .write_command(delay, FunctionCommand::ConvertT)?;
        self.wait_for_conversion(delay, wait)?;

        let mut raw = [0_u8; Scratchpad::BYTES];
        self.address(delay, target)?;
        self.driver
            .write_command(delay, FunctionCommand::ReadScratchpad)?;
        self.driver.read_bytes(delay, &mut raw)?;

        self.scratchpad = Scratchpad::from(raw);
        let raw_temperature = self.scratchpad.raw_temperature();
        match target {
            Some(id) => debug!("convert: {} reads {:#06x}", id, raw_temperature),
            None => debug!("convert: broadcast reads {:#06x}", raw_temperature),
        }
        Ok(&self.scratchpad)
    }

    fn address(
        &mut self,
        delay: &mut impl DelayNs,
        target: Option<&Identifier>,
    ) -> Result<(), Error<E>> {
        match target {
            Some(id) => self.driver.reset_select(delay, id),
            None => self.driver.reset_skip(delay),
        }
    }

    /// Polls read slots until the device stops holding the line low
    fn wait_for_conversion(
        &mut self,
        delay: &mut impl DelayNs,
        wait: &ConversionWait,
    ) -> Result<(), Error<E>> {
        let slot = self.driver.timing().read_slot();
        let mut waited = 0_u32;
        loop {
            if self.driver.read_bit(delay)? {
                return Ok(());
            }
            waited = waited.saturating_add(slot.saturating_add(wait.poll_interval_us));
            if waited >= wait.timeout_us {
                warn!("convert: still busy after {} us", waited);
                return Err(Error::ConversionTimeout);
            }
            delay.delay_us(wait.poll_interval_us);
        }
    }

    /// The most recently read scratchpad
    pub fn scratchpad(&self) -> &Scratchpad {
        &self.scratchpad
    }

    /// Low and high temperature byte of the most recently read scratchpad
    pub fn temperature_bytes(&self) -> (u8, u8) {
        self.scratchpad.temperature_bytes()
    }

    pub fn temperature(&self) -> Temperature {
        let (lo, hi) = self.temperature_bytes();
        Temperature::from_bytes(lo, hi)
    }
}
