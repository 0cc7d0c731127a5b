pub trait OpCode {
    fn op_code(&self) -> u8;
}

/// Addressing commands, understood by every device right after a reset
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RomCommand {
    /// Address all devices at once
    SkipRom = 0xCC,
    /// Address the one device whose identifier follows
    MatchRom = 0x55,
    /// Start a round of the identifier search
    SearchRom = 0xF0,
    /// Read the identifier of the only device on the bus
    ReadRom = 0x33,
}

impl OpCode for RomCommand {
    fn op_code(&self) -> u8 {
        *self as _
    }
}

/// Function commands, sent once one or more devices are addressed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionCommand {
    /// Begin a temperature conversion
    ConvertT = 0x44,
    /// Read back the 9 byte scratchpad
    ReadScratchpad = 0xBE,
}

impl OpCode for FunctionCommand {
    fn op_code(&self) -> u8 {
        *self as _
    }
}
