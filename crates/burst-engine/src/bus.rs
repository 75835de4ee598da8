//! Bus-facing signals of the two master ports and the slave seam.
//!
//! The engine drives `*PortOut` every step and samples `*PortIn` at the
//! edge. Semantics follow a split address/data-phase bus:
//!
//! - a command is accepted on the step where the request strobe is high and
//!   back-pressure is low;
//! - read data returns as valid beats, in command acceptance order;
//! - write data travels with the request strobe, one beat per step, the
//!   address being the burst start address for every beat.

/// One address-phase request: one burst, not one beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusCommand {
    /// Byte address of the first word of the burst
    pub address: u32,
    /// Words in the burst
    pub burst_length_words: u32,
}

impl BusCommand {
    /// Create a command
    pub const fn new(address: u32, burst_length_words: u32) -> Self {
        Self {
            address,
            burst_length_words,
        }
    }

    /// Byte address of beat `index` within the burst (burst-start addressing)
    pub const fn beat_address(&self, index: u32) -> u32 {
        self.address.wrapping_add(index.wrapping_mul(4))
    }
}

/// One data-phase transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataBeat {
    /// Payload
    pub value: u32,
    /// Strobe
    pub valid: bool,
}

impl DataBeat {
    /// No beat this step.
    pub const IDLE: Self = Self {
        value: 0,
        valid: false,
    };

    /// A valid beat carrying `value`
    pub const fn valid(value: u32) -> Self {
        Self { value, valid: true }
    }
}

/// Read master outputs (address phase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadPortOut {
    /// Read strobe + command, `None` when the strobe is low
    pub request: Option<BusCommand>,
}

/// Read master inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadPortIn {
    /// Slave cannot accept a command this step
    pub backpressure: bool,
    /// Returned data
    pub beat: DataBeat,
}

/// Write master outputs (address and data travel together).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WritePortOut {
    /// Burst being written, held for the whole data phase
    pub command: BusCommand,
    /// Write strobe
    pub request: bool,
    /// Payload of the current beat
    pub data: u32,
}

impl WritePortOut {
    /// Strobe low
    pub const IDLE: Self = Self {
        command: BusCommand::new(0, 0),
        request: false,
        data: 0,
    };
}

/// Write master inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WritePortIn {
    /// Slave cannot accept a beat this step
    pub backpressure: bool,
}

/// Response of the interconnect for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusResponse {
    /// Read side inputs
    pub read: ReadPortIn,
    /// Write side inputs
    pub write: WritePortIn,
}

/// Everything behind the two master ports.
///
/// Called once per engine step with the engine's outputs for that step. The
/// returned response is what the engine samples at the edge, so a slave must
/// only return read data for commands it accepted in *earlier* steps.
pub trait BusSlave {
    /// Advance the slave by one step
    fn cycle(&mut self, read: &ReadPortOut, write: &WritePortOut) -> BusResponse;
}

impl<T: BusSlave + ?Sized> BusSlave for &mut T {
    fn cycle(&mut self, read: &ReadPortOut, write: &WritePortOut) -> BusResponse {
        (**self).cycle(read, write)
    }
}

impl<T: BusSlave + ?Sized> BusSlave for Box<T> {
    fn cycle(&mut self, read: &ReadPortOut, write: &WritePortOut) -> BusResponse {
        (**self).cycle(read, write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beat_addresses_follow_burst_start() {
        let cmd = BusCommand::new(0x5000, 4);
        assert_eq!(cmd.beat_address(0), 0x5000);
        assert_eq!(cmd.beat_address(3), 0x500C);
    }

    #[test]
    fn idle_defaults() {
        assert!(!DataBeat::IDLE.valid);
        assert!(!WritePortOut::IDLE.request);
        assert_eq!(ReadPortOut::default().request, None);
    }
}
