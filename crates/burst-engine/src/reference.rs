//! Software reference model
//!
//! Computes the destination image a transfer must produce, straight from the
//! source words, without any notion of cycles. Captured before the transfer
//! so overlapping ranges are handled.

use burst_chip::regs::WORD_BYTES;
use burst_chip::Capabilities;

use crate::csr::TransferConfig;
use crate::error::{EngineError, Result};
use crate::memory::SparseMemory;
use crate::transform::transform_word;

/// Expected destination words of one transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceModel {
    destination: u32,
    expected: Vec<u32>,
}

impl ReferenceModel {
    /// Snapshot the source range of `config` and apply the transform
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the padded length does not
    /// fit 32 bits.
    pub fn capture(
        memory: &SparseMemory,
        config: &TransferConfig,
        capabilities: &Capabilities,
    ) -> Result<Self> {
        let effective = config.effective_length_bytes().ok_or_else(|| {
            EngineError::invalid_config(format!(
                "padded length of {} bytes exceeds 32 bits",
                config.length_bytes
            ))
        })?;
        let expected = memory
            .read_range(config.source_address, effective / WORD_BYTES)
            .into_iter()
            .map(|word| transform_word(word, config.coefficient, capabilities))
            .collect();
        Ok(Self {
            destination: config.destination_address,
            expected,
        })
    }

    /// Destination base address
    pub const fn destination(&self) -> u32 {
        self.destination
    }

    /// Expected words, in address order
    pub fn expected(&self) -> &[u32] {
        &self.expected
    }

    /// Compare the destination range of `memory` with the expectation.
    /// Returns the number of words checked.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::VerificationFailed`] for the first differing word.
    pub fn verify(&self, memory: &SparseMemory) -> Result<usize> {
        for (i, &expected) in (0u32..).zip(&self.expected) {
            let address = self.destination.wrapping_add(i * WORD_BYTES);
            let actual = memory.read_word(address);
            if actual != expected {
                return Err(EngineError::VerificationFailed {
                    address,
                    expected,
                    actual,
                });
            }
        }
        Ok(self.expected.len())
    }
}
