#![no_std]
#![doc = include_str!("../README.md")]

mod command;
mod driver;
mod identifier;
mod iowire;
mod registry;
mod result;
mod scratchpad;
mod search;
mod session;
#[cfg(test)]
mod sim;
mod temperature;
mod timing;

pub use command::{FunctionCommand, OpCode, RomCommand};
pub use driver::Driver;
pub use identifier::{Identifier, IdentifierError};
pub use iowire::{Inverted, IoWire};
pub use registry::Registry;
pub use result::Error;
pub use scratchpad::Scratchpad;
pub use search::{SearchIter, SearchState};
pub use session::{ConversionWait, Discovery, Session};
pub use temperature::Temperature;
pub use timing::Timing;
