//! Control/status register file.
//!
//! Owns the [`TransferConfig`] and the done bit. The controller borrows the
//! configuration when a transfer starts; nothing else writes it.

use burst_chip::regs::{self, Register, RegisterLayout};
use burst_chip::effective_length;
use tracing::{debug, warn};

use crate::config::EngineConfig;

/// Transfer parameters as programmed through the CSR block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    /// Source base address (bytes)
    pub source_address: u32,
    /// Destination base address (bytes)
    pub destination_address: u32,
    /// Length as last written to LENGTH (bytes)
    pub requested_length_bytes: u32,
    /// Padded length stored by the LENGTH write; what LENGTH reads back
    pub length_bytes: u32,
    /// Read burst size (words)
    pub read_burst_words: u32,
    /// Write burst size (words)
    pub write_burst_words: u32,
    /// Transform coefficient
    pub coefficient: u32,
}

impl TransferConfig {
    /// Reset state for an engine configuration
    pub const fn reset(config: &EngineConfig) -> Self {
        Self {
            source_address: 0,
            destination_address: 0,
            requested_length_bytes: 0,
            length_bytes: 0,
            read_burst_words: config.read_burst_words,
            write_burst_words: config.write_burst_words,
            coefficient: config.reset_coefficient,
        }
    }

    /// Length actually moved: the stored LENGTH, re-padded only if RD_BURST
    /// grew past its alignment after the LENGTH write. `None` if that
    /// padding overflows 32 bits.
    pub const fn effective_length_bytes(&self) -> Option<u32> {
        effective_length(self.length_bytes, self.read_burst_words)
    }
}

/// Side effect of a CSR write the controller must see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrEvent {
    /// Plain register update or ignored write
    None,
    /// CONTROL.start was pulsed
    Start,
    /// STATUS.done was cleared by a write of 1
    DoneCleared,
}

/// CSR block
#[derive(Debug, Clone)]
pub struct RegisterFile {
    engine: EngineConfig,
    layout: RegisterLayout,
    config: TransferConfig,
    done: bool,
    busy: bool,
}

impl RegisterFile {
    /// Register file in its reset state
    pub fn new(engine: &EngineConfig) -> Self {
        Self {
            engine: *engine,
            layout: RegisterLayout::for_capabilities(&engine.capabilities),
            config: TransferConfig::reset(engine),
            done: false,
            busy: false,
        }
    }

    /// Index decode for this engine
    pub const fn layout(&self) -> &RegisterLayout {
        &self.layout
    }

    /// Current transfer configuration
    pub const fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// STATUS.done
    pub const fn done(&self) -> bool {
        self.done
    }

    /// Raise STATUS.done (controller only)
    pub(crate) fn set_done(&mut self) {
        self.done = true;
    }

    /// Mirror the controller's activity into STATUS.busy
    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Return to the reset state
    pub fn reset(&mut self) {
        self.config = TransferConfig::reset(&self.engine);
        self.done = false;
        self.busy = false;
    }

    /// Read a register. Unmapped and write-only slots read as zero.
    pub fn read(&self, index: u32) -> u32 {
        let Some(reg) = self.layout.decode(index) else {
            return 0;
        };
        match reg {
            Register::Control => 0,
            Register::Status => {
                let mut value = 0;
                if self.done {
                    value |= regs::status::DONE;
                }
                if self.busy {
                    value |= regs::status::BUSY;
                }
                value
            }
            Register::SrcAddr => self.config.source_address,
            Register::DstAddr => self.config.destination_address,
            Register::Length => self.config.length_bytes,
            Register::ReadBurst => self.config.read_burst_words,
            Register::WriteBurst => self.config.write_burst_words,
            Register::Coefficient => self.config.coefficient,
        }
    }

    /// Write a register.
    ///
    /// `active` is true while a transfer is configured or running; writes to
    /// configuration registers are then ignored.
    pub fn write(&mut self, index: u32, value: u32, active: bool) -> CsrEvent {
        let Some(reg) = self.layout.decode(index) else {
            debug!("CSR write to unmapped index {index} ignored");
            return CsrEvent::None;
        };

        match reg {
            Register::Control => {
                if value & regs::control::START != 0 {
                    CsrEvent::Start
                } else {
                    CsrEvent::None
                }
            }
            Register::Status => {
                if value & regs::status::DONE != 0 && self.done {
                    self.done = false;
                    debug!("STATUS.done cleared");
                    CsrEvent::DoneCleared
                } else {
                    CsrEvent::None
                }
            }
            _ if active => {
                warn!("CSR write {reg} = {value:#x} ignored: transfer active");
                CsrEvent::None
            }
            Register::SrcAddr => {
                self.config.source_address = value;
                CsrEvent::None
            }
            Register::DstAddr => {
                self.config.destination_address = value;
                CsrEvent::None
            }
            Register::Length => {
                if let Some(padded) = effective_length(value, self.config.read_burst_words) {
                    self.config.requested_length_bytes = value;
                    self.config.length_bytes = padded;
                } else {
                    warn!("LENGTH = {value:#x} ignored: padded length exceeds 32 bits");
                }
                CsrEvent::None
            }
            Register::ReadBurst => {
                let fits = self.engine.bursts_fit(value, self.config.write_burst_words)
                    && effective_length(self.config.length_bytes, value).is_some();
                if fits {
                    self.config.read_burst_words = value;
                } else {
                    warn!("RD_BURST = {value} ignored: unsupported burst size");
                }
                CsrEvent::None
            }
            Register::WriteBurst => {
                if self.engine.bursts_fit(self.config.read_burst_words, value) {
                    self.config.write_burst_words = value;
                } else {
                    warn!("WR_BURST = {value} ignored: unsupported burst size");
                }
                CsrEvent::None
            }
            Register::Coefficient => {
                self.config.coefficient = value;
                CsrEvent::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burst_chip::regs::{COEFF_HIGH, DST_ADDR, LENGTH, SLOT_5, SRC_ADDR, STATUS, WR_BURST};
    use burst_chip::Variant;

    fn csr(variant: Variant) -> RegisterFile {
        RegisterFile::new(&EngineConfig::for_variant(variant))
    }

    #[test]
    fn length_reads_back_padded() {
        let mut r = csr(Variant::Pipelined);
        r.write(LENGTH, 100, false);
        assert_eq!(r.read(LENGTH), 1024);
        assert_eq!(r.config().requested_length_bytes, 100);
        r.write(LENGTH, 2048, false);
        assert_eq!(r.read(LENGTH), 2048);
    }

    #[test]
    fn length_is_padded_when_written() {
        let mut r = csr(Variant::MultiplyDivide);
        r.write(LENGTH, 100, false);
        assert_eq!(r.read(LENGTH), 1024);
        r.write(SLOT_5, 8, false);
        assert_eq!(r.read(LENGTH), 1024);
        assert_eq!(r.config().effective_length_bytes(), Some(1024));

        r.write(LENGTH, 100, false);
        assert_eq!(r.read(LENGTH), 128);
        r.write(SLOT_5, 64, false);
        assert_eq!(r.read(LENGTH), 128);
        // 128 is not a multiple of a 64-word burst
        assert_eq!(r.config().effective_length_bytes(), Some(256));
    }

    #[test]
    fn done_is_write_one_to_clear() {
        let mut r = csr(Variant::Pipelined);
        r.set_done();
        assert_eq!(r.write(STATUS, 0, false), CsrEvent::None);
        assert_eq!(r.read(STATUS) & regs::status::DONE, regs::status::DONE);
        assert_eq!(r.write(STATUS, 1, false), CsrEvent::DoneCleared);
        assert_eq!(r.read(STATUS), 0);
    }

    #[test]
    fn clearing_an_unset_done_is_silent() {
        let mut r = csr(Variant::Pipelined);
        assert_eq!(r.write(STATUS, 1, false), CsrEvent::None);
    }

    #[test]
    fn busy_bit_is_read_only() {
        let mut r = csr(Variant::Pipelined);
        r.set_busy(true);
        r.write(STATUS, regs::status::BUSY, false);
        assert_eq!(r.read(STATUS), regs::status::BUSY);
    }

    #[test]
    fn config_writes_ignored_while_active() {
        let mut r = csr(Variant::Multiply);
        r.write(SRC_ADDR, 0x1000, false);
        r.write(SRC_ADDR, 0x9999, true);
        r.write(DST_ADDR, 0x4444, true);
        r.write(SLOT_5, 7, true);
        assert_eq!(r.read(SRC_ADDR), 0x1000);
        assert_eq!(r.read(DST_ADDR), 0);
        assert_eq!(r.read(SLOT_5), regs::RESET_COEFFICIENT);
    }

    #[test]
    fn start_pulse_reported() {
        let mut r = csr(Variant::Basic);
        assert_eq!(r.write(regs::CONTROL, 1, false), CsrEvent::Start);
        assert_eq!(r.write(regs::CONTROL, 2, false), CsrEvent::None);
        assert_eq!(r.read(regs::CONTROL), 0);
    }

    #[test]
    fn invalid_bursts_keep_previous_value() {
        let mut r = csr(Variant::MultiplyDivide);
        r.write(SLOT_5, 64, false);
        r.write(WR_BURST, 32, false);
        r.write(SLOT_5, 48, false);
        r.write(WR_BURST, 0, false);
        r.write(WR_BURST, 1024, false);
        assert_eq!(r.read(SLOT_5), 64);
        assert_eq!(r.read(WR_BURST), 32);
    }

    #[test]
    fn coefficient_slot_depends_on_variant() {
        let mut mul = csr(Variant::Multiply);
        mul.write(SLOT_5, 3, false);
        assert_eq!(mul.config().coefficient, 3);

        let mut muldiv = csr(Variant::MultiplyDivide);
        muldiv.write(COEFF_HIGH, 3, false);
        assert_eq!(muldiv.config().coefficient, 3);
        assert_eq!(muldiv.read(SLOT_5), regs::DEFAULT_BURST_WORDS);
    }

    #[test]
    fn unmapped_slots_read_zero() {
        let mut r = csr(Variant::Basic);
        r.write(SLOT_5, 77, false);
        r.write(COEFF_HIGH, 77, false);
        assert_eq!(r.read(SLOT_5), 0);
        assert_eq!(r.read(COEFF_HIGH), 0);
        assert_eq!(r.read(100), 0);
    }
}
