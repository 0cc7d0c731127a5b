use crate::{Driver, Error, Identifier, IoWire, RomCommand};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use log::{trace, warn};

/// Progress of one enumeration of the identifiers on a bus.
///
/// One round of the search resolves one identifier. The state remembers the
/// identifier of the previous round and the last position where devices
/// disagreed and the 0 branch was taken, so the next round can walk the same
/// path up to there and take the 1 branch instead.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    candidate: Identifier,
    /// 1-based bit position of the last unresolved branch, 0 if none
    last_discrepancy: u8,
    last_device: bool,
}

impl SearchState {
    pub fn new() -> SearchState {
        SearchState::default()
    }

    /// Position (1 to 64) of the branch the next round will flip, 0 when none is left
    pub fn last_discrepancy(&self) -> u8 {
        self.last_discrepancy
    }

    /// Whether the previous round found the last identifier
    pub fn is_complete(&self) -> bool {
        self.last_device
    }

    fn restart(&mut self) {
        self.candidate = Identifier::default();
        self.last_discrepancy = 0;
        self.last_device = false;
    }

    /// Walks the remaining rounds of this search as an iterator
    pub fn into_iter<'a, W: IoWire, D: DelayNs>(
        self,
        driver: &'a mut Driver<W>,
        delay: &'a mut D,
    ) -> SearchIter<'a, W, D> {
        SearchIter {
            search: Some(self),
            driver,
            delay,
        }
    }
}

/// Yields every identifier on the bus, stopping after the first error
pub struct SearchIter<'a, W: IoWire, D: DelayNs> {
    search: Option<SearchState>,
    driver: &'a mut Driver<W>,
    delay: &'a mut D,
}

impl<W: IoWire, D: DelayNs> Iterator for SearchIter<'_, W, D> {
    type Item = Result<Identifier, Error<W::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut search = self.search.take()?;
        match self.driver.search_next(&mut search, &mut *self.delay) {
            Ok(Some(id)) => {
                self.search = Some(search);
                Some(Ok(id))
            }
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<E: Debug, W: IoWire<Error = E>> Driver<W> {
    /// Starts a fresh enumeration and returns the first identifier
    pub fn search_first(
        &mut self,
        search: &mut SearchState,
        delay: &mut impl DelayNs,
    ) -> Result<Option<Identifier>, Error<E>> {
        search.restart();
        self.search_next(search, delay)
    }

    /// Runs one search round.
    ///
    /// Returns `Ok(None)` once the round after the last identifier is reached; that
    /// call clears the completion flag without touching the bus. A missing presence
    /// pulse or a position where nobody answers fails the round and forgets the
    /// discrepancy marker, so the next call starts over.
    pub fn search_next(
        &mut self,
        search: &mut SearchState,
        delay: &mut impl DelayNs,
    ) -> Result<Option<Identifier>, Error<E>> {
        if search.last_device {
            search.last_device = false;
            return Ok(None);
        }

        match self.search_round(search, delay) {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                search.last_discrepancy = 0;
                Err(e)
            }
        }
    }

    fn search_round(
        &mut self,
        search: &mut SearchState,
        delay: &mut impl DelayNs,
    ) -> Result<Identifier, Error<E>> {
        self.reset(delay)?;
        self.write_command(delay, RomCommand::SearchRom)?;

        let mut last_zero = 0_u8;
        for index in 0..Identifier::BITS {
            let position = index + 1;
            let id_bit = self.read_bit(delay)?;
            let cmp_bit = self.read_bit(delay)?;

            let direction = match (id_bit, cmp_bit) {
                (true, true) => {
                    warn!("search: no device answered at bit {}", position);
                    return Err(Error::ContentionAbort);
                }
                (true, false) => true,
                (false, true) => false,
                (false, false) => {
                    // devices disagree, replay the previous path before the marker
                    let direction = if position < search.last_discrepancy {
                        search.candidate.bit(index)
                    } else {
                        position == search.last_discrepancy
                    };
                    if !direction {
                        last_zero = position;
                    }
                    direction
                }
            };

            self.write_bit(delay, direction)?;
            search.candidate.set_bit(index, direction);
        }

        search.last_discrepancy = last_zero;
        search.last_device = last_zero == 0;
        trace!(
            "search: found {}, last discrepancy {}",
            search.candidate,
            last_zero
        );
        Ok(search.candidate)
    }
}
