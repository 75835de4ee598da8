//! Hardware model of the burst DMA engine family.
//!
//! This crate has **no dependencies** and **no behaviour**. It is the
//! static description of the block, namely CSR indices and bit definitions, reset
//! values, capability flags and the variant presets. The cycle model lives in
//! `burst-engine`.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | CSR word indices, bit definitions, reset values, per-capability decode |
//! | [`variant`] | [`Capabilities`] flags and the four [`Variant`] presets |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod regs;
pub mod variant;

pub use regs::{Register, RegisterLayout};
pub use variant::{Capabilities, UnknownVariant, Variant};

/// Effective (padded) transfer length in bytes.
///
/// Smallest multiple of `read_burst_words * 4` that is `>= requested_bytes`,
/// or `None` if that multiple does not fit in 32 bits. A zero burst size
/// leaves the length unpadded.
pub const fn effective_length(requested_bytes: u32, read_burst_words: u32) -> Option<u32> {
    let Some(unit) = read_burst_words.checked_mul(regs::WORD_BYTES) else {
        return None;
    };
    if unit == 0 {
        return Some(requested_bytes);
    }
    requested_bytes.div_ceil(unit).checked_mul(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_length_unchanged() {
        assert_eq!(effective_length(2048, 256), Some(2048));
        assert_eq!(effective_length(1024, 256), Some(1024));
    }

    #[test]
    fn unaligned_length_rounds_up() {
        assert_eq!(effective_length(1, 256), Some(1024));
        assert_eq!(effective_length(1025, 256), Some(2048));
        assert_eq!(effective_length(100, 8), Some(128));
    }

    #[test]
    fn zero_length_stays_zero() {
        assert_eq!(effective_length(0, 64), Some(0));
    }

    #[test]
    fn padding_past_u32_is_none() {
        assert_eq!(effective_length(u32::MAX, 256), None);
        assert_eq!(effective_length(u32::MAX - 1023, 256), Some(u32::MAX - 1023));
    }
}
