//! Engine configuration
//!
//! Everything that is fixed when the engine is instantiated ("synthesis
//! parameters"): capability set, buffer depth, burst sizes of the fixed-burst
//! variants and the coefficient reset value. Run-time configuration goes
//! through the CSR block instead.

use burst_chip::regs::{DEFAULT_BURST_WORDS, RESET_COEFFICIENT};
use burst_chip::{Capabilities, Variant};
use tracing::debug;

use crate::error::{EngineError, Result};

/// Instantiation parameters of one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Feature set
    pub capabilities: Capabilities,

    /// Depth of the elastic buffer and of the post-pipeline staging buffer (words)
    pub buffer_depth_words: u32,

    /// Read burst size after reset (the only size without a programmable read burst)
    pub read_burst_words: u32,

    /// Write burst size after reset (the only size without a programmable write burst)
    pub write_burst_words: u32,

    /// COEFF register value after reset
    pub reset_coefficient: u32,
}

impl EngineConfig {
    /// Buffer depth used by the presets: one read plus one write burst.
    pub const DEFAULT_BUFFER_DEPTH: u32 = 2 * DEFAULT_BURST_WORDS;

    /// Largest buffer depth accepted by [`validate`](Self::validate).
    pub const MAX_BUFFER_DEPTH: u32 = 1 << 16;

    /// Configuration of a preset variant
    pub const fn for_variant(variant: Variant) -> Self {
        Self::with_capabilities(variant.capabilities())
    }

    /// Configuration for a custom capability set, preset sizes
    pub const fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            buffer_depth_words: Self::DEFAULT_BUFFER_DEPTH,
            read_burst_words: DEFAULT_BURST_WORDS,
            write_burst_words: DEFAULT_BURST_WORDS,
            reset_coefficient: RESET_COEFFICIENT,
        }
    }

    /// Set the buffer depth (words, power of two)
    #[must_use]
    pub const fn with_buffer_depth(mut self, words: u32) -> Self {
        self.buffer_depth_words = words;
        self
    }

    /// Set the reset / fixed read burst size (words)
    #[must_use]
    pub const fn with_read_burst(mut self, words: u32) -> Self {
        self.read_burst_words = words;
        self
    }

    /// Set the reset / fixed write burst size (words)
    #[must_use]
    pub const fn with_write_burst(mut self, words: u32) -> Self {
        self.write_burst_words = words;
        self
    }

    /// Set the coefficient reset value
    #[must_use]
    pub const fn with_reset_coefficient(mut self, coefficient: u32) -> Self {
        self.reset_coefficient = coefficient;
        self
    }

    /// Check that a read/write burst pair can run on this buffer.
    ///
    /// Both sizes must be non-zero powers of two. A single-outstanding reader
    /// needs room for one read burst; a pipelined reader needs room for one
    /// read burst plus one write burst.
    pub const fn bursts_fit(&self, read_burst_words: u32, write_burst_words: u32) -> bool {
        if !read_burst_words.is_power_of_two() || !write_burst_words.is_power_of_two() {
            return false;
        }
        let depth = self.buffer_depth_words;
        if write_burst_words > depth {
            return false;
        }
        if self.capabilities.single_outstanding_read {
            read_burst_words <= depth
        } else {
            match read_burst_words.checked_add(write_burst_words) {
                Some(sum) => sum <= depth,
                None => false,
            }
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the buffer depth is not a power of two within
    /// [`MAX_BUFFER_DEPTH`](Self::MAX_BUFFER_DEPTH), if the divide stage is
    /// requested without the transform pipeline, or if the reset burst sizes
    /// do not fit the buffer.
    pub fn validate(&self) -> Result<()> {
        let depth = self.buffer_depth_words;
        if !depth.is_power_of_two() || depth > Self::MAX_BUFFER_DEPTH {
            return Err(EngineError::invalid_config(format!(
                "buffer depth {depth} must be a power of two <= {}",
                Self::MAX_BUFFER_DEPTH
            )));
        }
        if self.capabilities.has_divide_stage && !self.capabilities.has_transform_pipeline {
            return Err(EngineError::invalid_config(
                "divide stage requires the transform pipeline",
            ));
        }
        if !self.bursts_fit(self.read_burst_words, self.write_burst_words) {
            return Err(EngineError::invalid_config(format!(
                "bursts rd={} wr={} do not fit a {depth}-word buffer ({})",
                self.read_burst_words,
                self.write_burst_words,
                if self.capabilities.single_outstanding_read {
                    "single-outstanding"
                } else {
                    "pipelined"
                }
            )));
        }
        debug!(
            "EngineConfig ok: depth={depth} rd={} wr={} caps={:?}",
            self.read_burst_words, self.write_burst_words, self.capabilities
        );
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::for_variant(Variant::Pipelined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        for v in Variant::ALL {
            assert!(EngineConfig::for_variant(v).validate().is_ok(), "{v}");
        }
    }

    #[test]
    fn depth_must_be_power_of_two() {
        let cfg = EngineConfig::default().with_buffer_depth(600);
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidConfig { .. })));
    }

    #[test]
    fn pipelined_needs_room_for_both_bursts() {
        let cfg = EngineConfig::for_variant(Variant::MultiplyDivide).with_buffer_depth(256);
        assert!(!cfg.bursts_fit(256, 256));
        assert!(cfg.bursts_fit(128, 128));
        assert!(cfg.bursts_fit(64, 32));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn single_outstanding_needs_one_read_burst() {
        let cfg = EngineConfig::for_variant(Variant::Basic).with_buffer_depth(256);
        assert!(cfg.bursts_fit(256, 256));
        assert!(!cfg.bursts_fit(512, 256));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn non_power_of_two_burst_rejected() {
        let cfg = EngineConfig::for_variant(Variant::MultiplyDivide);
        assert!(!cfg.bursts_fit(0, 32));
        assert!(!cfg.bursts_fit(48, 32));
    }

    #[test]
    fn divide_without_multiply_rejected() {
        let caps = Capabilities {
            has_divide_stage: true,
            ..Capabilities::default()
        };
        assert!(EngineConfig::with_capabilities(caps).validate().is_err());
    }
}
