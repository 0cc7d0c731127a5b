use core::fmt::Debug;
use thiserror::Error;

/// Error type
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error<E: Sized + Debug> {
    /// Nothing answered the reset pulse
    #[error("no presence pulse on the bus")]
    NoPresence,
    /// Both the bit and its complement read 1 during a search round
    #[error("search round aborted, no device answered")]
    ContentionAbort,
    /// More identifiers were found than the registry can hold
    #[error("found {found} devices, registry holds {capacity}")]
    CapacityExceeded { found: usize, capacity: usize },
    /// The device did not finish its conversion in time
    #[error("conversion did not complete before the deadline")]
    ConversionTimeout,
    /// Wire not high
    #[error("bus line stuck low")]
    WireFault,
    #[error("pin error: {0:?}")]
    PortError(E),
}

impl<E: Sized + Debug> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::PortError(e)
    }
}
