//! Inline arithmetic transform
//!
//! Up to two registered stages between the elastic buffer and the write
//! master:
//!
//! | Stage | Operation | Present with |
//! |-------|-----------|--------------|
//! | 1 | `word * coeff` (mod 2^32) | `has_transform_pipeline` |
//! | 2 | `(s1 * 5243) >> 21` (about `s1 / 400`) | `has_divide_stage` |
//!
//! Results land in a staging buffer of the same depth as the elastic buffer.
//! A stage only advances when the one after it has room, so nothing is lost
//! while the write side is stalled.

use burst_chip::Capabilities;
use tracing::trace;

use crate::error::Result;
use crate::fifo::ElasticBuffer;

/// Fixed-point reciprocal of 400 in Q21
pub const DIVIDE_MULTIPLIER: u64 = 5243;

/// Shift applied after the reciprocal multiply
pub const DIVIDE_SHIFT: u32 = 21;

/// Stage 1
pub const fn multiply(word: u32, coefficient: u32) -> u32 {
    word.wrapping_mul(coefficient)
}

/// Stage 2
#[allow(clippy::cast_possible_truncation)]
pub const fn divide_by_400(value: u32) -> u32 {
    ((value as u64 * DIVIDE_MULTIPLIER) >> DIVIDE_SHIFT) as u32
}

/// What the pipeline makes of one word for a given capability set
pub const fn transform_word(word: u32, coefficient: u32, capabilities: &Capabilities) -> u32 {
    if !capabilities.has_transform_pipeline {
        return word;
    }
    let product = multiply(word, coefficient);
    if capabilities.has_divide_stage {
        divide_by_400(product)
    } else {
        product
    }
}

/// Registered transform stages plus the staging buffer
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    multiply_enabled: bool,
    divide_enabled: bool,
    coefficient: u32,
    stage1: Option<u32>,
    stage2: Option<u32>,
    staging: ElasticBuffer,
}

impl TransformPipeline {
    /// Empty pipeline for a capability set
    pub fn new(capabilities: &Capabilities, depth: u32) -> Self {
        Self {
            multiply_enabled: capabilities.has_transform_pipeline,
            divide_enabled: capabilities.has_transform_pipeline && capabilities.has_divide_stage,
            coefficient: 1,
            stage1: None,
            stage2: None,
            staging: ElasticBuffer::new(depth),
        }
    }

    /// Latch the coefficient for a new transfer and flush all stages
    pub fn load(&mut self, coefficient: u32) {
        self.coefficient = coefficient;
        self.stage1 = None;
        self.stage2 = None;
        self.staging.clear();
    }

    /// Coefficient in use
    pub const fn coefficient(&self) -> u32 {
        self.coefficient
    }

    /// Number of arithmetic stages
    pub const fn stages(&self) -> u32 {
        self.multiply_enabled as u32 + self.divide_enabled as u32
    }

    /// Words held in the stage registers
    pub fn in_flight(&self) -> u32 {
        u32::from(self.stage1.is_some()) + u32::from(self.stage2.is_some())
    }

    /// Post-pipeline buffer
    pub const fn staging(&self) -> &ElasticBuffer {
        &self.staging
    }

    /// Post-pipeline buffer, drain side
    pub fn staging_mut(&mut self) -> &mut ElasticBuffer {
        &mut self.staging
    }

    /// Advance one step, pulling at most one word from `input`.
    ///
    /// Stages move back to front so a word never skips a register.
    ///
    /// # Errors
    ///
    /// Propagates [`EngineError::BufferOverflow`](crate::EngineError::BufferOverflow)
    /// from the staging buffer; cannot happen while stages check for room.
    pub fn advance(&mut self, input: &mut ElasticBuffer) -> Result<()> {
        if !self.multiply_enabled {
            if !self.staging.is_full() {
                if let Some(word) = input.pop() {
                    self.staging.push(word)?;
                }
            }
            return Ok(());
        }

        if self.divide_enabled {
            if let Some(word) = self.stage2 {
                if !self.staging.is_full() {
                    self.staging.push(word)?;
                    self.stage2 = None;
                }
            }
            if self.stage2.is_none() {
                self.stage2 = self.stage1.take().map(divide_by_400);
            }
        } else if let Some(word) = self.stage1 {
            if !self.staging.is_full() {
                self.staging.push(word)?;
                self.stage1 = None;
            }
        }

        if self.stage1.is_none() {
            if let Some(word) = input.pop() {
                let product = multiply(word, self.coefficient);
                trace!("transform: {word:#x} * {} = {product:#x}", self.coefficient);
                self.stage1 = Some(product);
            }
        }
        Ok(())
    }
}
