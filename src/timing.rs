/// Slot durations of the bus, in microseconds.
///
/// The absolute values depend on supply voltage, cable length and the
/// accuracy of the delay source, so they are tunable. What must hold is the
/// relative ordering checked by [`Timing::is_consistent`]: a written 1 is a
/// short low pulse, a written 0 a long one, both slots last equally long, and
/// a read samples well before a device gives up the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Low time of a reset pulse
    pub reset_low: u32,
    /// Time between releasing the reset pulse and sampling for presence
    pub presence_sample: u32,
    /// Remainder of the reset sequence after the presence sample
    pub reset_recovery: u32,
    /// Low time when writing a 1
    pub write_one_low: u32,
    /// Low time when writing a 0
    pub write_zero_low: u32,
    /// Total duration of a write slot, low time included
    pub write_slot: u32,
    /// Low time initiating a read slot
    pub read_low: u32,
    /// Settle time between releasing a read slot and sampling it
    pub read_sample: u32,
    /// Remainder of a read slot after the sample
    pub read_recovery: u32,
    /// How long to wait for the released line to rise before a reset
    pub rise_timeout: u32,
}

impl Timing {
    /// Standard speed, as recommended for DS18B20-class devices
    pub const STANDARD: Timing = Timing {
        reset_low: 480,
        presence_sample: 70,
        reset_recovery: 410,
        write_one_low: 6,
        write_zero_low: 60,
        write_slot: 70,
        read_low: 3,
        read_sample: 10,
        read_recovery: 53,
        rise_timeout: 250,
    };

    /// Duration of a complete read slot
    pub const fn read_slot(&self) -> u32 {
        self.read_low
            .saturating_add(self.read_sample)
            .saturating_add(self.read_recovery)
    }

    /// Checks the relative ordering the protocol depends on
    pub const fn is_consistent(&self) -> bool {
        self.write_one_low < self.write_zero_low
            && self.write_zero_low < self.write_slot
            && self.read_low < self.write_zero_low
            && self.read_low.saturating_add(self.read_sample) < self.write_zero_low
            && self.presence_sample < self.reset_low
            && self.write_slot < self.reset_low
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::STANDARD
    }
}
