use embedded_hal::digital::{Error, ErrorType, InputPin, OutputPin};

/// The single data line of a 1-Wire bus.
///
/// The line is open-drain: the master either actively pulls it to logic 0 or
/// lets go of it, after which the external pull-up (or a responding device)
/// decides the level.
pub trait IoWire {
    type Error: Error;

    /// Forces the line to logic 0
    fn drive_low(&mut self) -> Result<(), Self::Error>;

    /// Stops driving the line, leaving it high-impedance
    ///
    /// *NOTE* the line only reads high afterwards if nothing else on the bus holds it low
    fn release(&mut self) -> Result<(), Self::Error>;

    /// Reads the current level of the line without changing its direction, `true` is high
    fn sample(&mut self) -> Result<bool, Self::Error>;
}

/// Single open-drain pin config wrapper
impl<IO> IoWire for (IO,)
where
    IO: ErrorType + OutputPin + InputPin,
{
    type Error = IO::Error;

    fn drive_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }

    fn sample(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }
}

/// Dual line config wrapper, input pin first
impl<E, I, O> IoWire for (I, O)
where
    E: Error,
    I: ErrorType<Error = E> + InputPin,
    O: ErrorType<Error = E> + OutputPin,
{
    type Error = E;

    fn drive_low(&mut self) -> Result<(), Self::Error> {
        self.1.set_low()
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.1.set_high()
    }

    fn sample(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }
}

/// Inverted pin wrapper, for buses behind an inverting transistor stage
pub struct Inverted<P>(pub P);

impl<P: ErrorType> ErrorType for Inverted<P> {
    type Error = P::Error;
}

impl<P> InputPin for Inverted<P>
where
    P: InputPin,
{
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }
}

impl<P> OutputPin for Inverted<P>
where
    P: OutputPin,
{
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }
}
