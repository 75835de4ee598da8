//! CSR register map of the burst engine.
//!
//! Registers are 32 bits wide and addressed by word index (byte offset is
//! `index * 4`). Indices 0..=4 are common to every variant; indices 5..=7
//! depend on the capability set, see [`RegisterLayout`].
//!
//! ```text
//! idx  name       access  meaning
//! ───  ─────────  ──────  ────────────────────────────────────────────────
//!  0   CONTROL    W       bit0 start (pulse), ignored unless idle
//!  1   STATUS     R/W1C   bit0 done (write 1 to clear), bit1 busy (RO)
//!  2   SRC_ADDR   R/W     source base address
//!  3   DST_ADDR   R/W     destination base address
//!  4   LENGTH     R/W     write: requested bytes, read: padded bytes
//!  5   RD_BURST   R/W     read burst words      (programmable read burst)
//!      COEFF      R/W     transform coefficient (otherwise, with transform)
//!  6   WR_BURST   R/W     write burst words     (programmable write burst)
//!  7   COEFF      R/W     transform coefficient (when 5 is RD_BURST)
//! ```

use crate::variant::Capabilities;

// ── Common registers ─────────────────────────────────────────────────────────

/// Control register. Write-only.
pub const CONTROL: u32 = 0;
/// Status register. Read / write-one-to-clear.
pub const STATUS: u32 = 1;
/// Source base address.
pub const SRC_ADDR: u32 = 2;
/// Destination base address.
pub const DST_ADDR: u32 = 3;
/// Requested length on write, padded effective length on read.
pub const LENGTH: u32 = 4;

// ── Variant-dependent registers ──────────────────────────────────────────────

/// Shared slot: read burst size or transform coefficient.
pub const SLOT_5: u32 = 5;
/// Write burst size (programmable write burst only).
pub const WR_BURST: u32 = 6;
/// Transform coefficient when slot 5 holds the read burst size.
pub const COEFF_HIGH: u32 = 7;

/// Number of word slots decoded by the CSR block.
pub const REGISTER_COUNT: u32 = 8;

/// Bytes per register / per bus word.
pub const WORD_BYTES: u32 = 4;

// ── Bit definitions ──────────────────────────────────────────────────────────

/// CONTROL register bits
pub mod control {
    /// Start a transfer (pulse, self-clearing).
    pub const START: u32 = 1 << 0;
}

/// STATUS register bits
pub mod status {
    /// Transfer complete. Write 1 to clear.
    pub const DONE: u32 = 1 << 0;
    /// Transfer configured or running. Read-only.
    pub const BUSY: u32 = 1 << 1;
}

// ── Reset values ─────────────────────────────────────────────────────────────

/// Burst size of the fixed-burst variants, in words.
pub const DEFAULT_BURST_WORDS: u32 = 256;
/// Coefficient after reset (identity multiply).
pub const RESET_COEFFICIENT: u32 = 1;

/// Named register at a decoded index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Start pulse
    Control,
    /// Done (W1C) and busy
    Status,
    /// Source base address
    SrcAddr,
    /// Destination base address
    DstAddr,
    /// Requested / effective length
    Length,
    /// Read burst size (words)
    ReadBurst,
    /// Write burst size (words)
    WriteBurst,
    /// Transform coefficient
    Coefficient,
}

impl Register {
    /// Mnemonic as used in the register table.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Control => "CONTROL",
            Self::Status => "STATUS",
            Self::SrcAddr => "SRC_ADDR",
            Self::DstAddr => "DST_ADDR",
            Self::Length => "LENGTH",
            Self::ReadBurst => "RD_BURST",
            Self::WriteBurst => "WR_BURST",
            Self::Coefficient => "COEFF",
        }
    }

    /// Access mode string.
    pub const fn access(self) -> &'static str {
        match self {
            Self::Control => "W",
            Self::Status => "R/W1C",
            _ => "R/W",
        }
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Index → register decode for one capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLayout {
    slots: [Option<Register>; REGISTER_COUNT as usize],
}

impl RegisterLayout {
    /// Decode table for the given capabilities.
    pub const fn for_capabilities(caps: &Capabilities) -> Self {
        let slot5 = if caps.programmable_read_burst {
            Some(Register::ReadBurst)
        } else if caps.has_transform_pipeline {
            Some(Register::Coefficient)
        } else {
            None
        };
        let slot6 = if caps.programmable_write_burst {
            Some(Register::WriteBurst)
        } else {
            None
        };
        let slot7 = if caps.has_transform_pipeline && caps.programmable_read_burst {
            Some(Register::Coefficient)
        } else {
            None
        };

        Self {
            slots: [
                Some(Register::Control),
                Some(Register::Status),
                Some(Register::SrcAddr),
                Some(Register::DstAddr),
                Some(Register::Length),
                slot5,
                slot6,
                slot7,
            ],
        }
    }

    /// Register decoded at `index`, `None` if the slot is unmapped.
    pub fn decode(&self, index: u32) -> Option<Register> {
        self.slots.get(index as usize).copied().flatten()
    }

    /// Index of a register, `None` if this layout does not expose it.
    pub fn index_of(&self, reg: Register) -> Option<u32> {
        self.slots
            .iter()
            .position(|slot| *slot == Some(reg))
            .map(|i| i as u32)
    }

    /// Iterate over mapped `(index, register)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Register)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|reg| (i as u32, reg)))
    }
}
