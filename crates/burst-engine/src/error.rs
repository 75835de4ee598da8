//! Error types for burst engine operations

use thiserror::Error;

/// Result type alias for burst engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while building or driving the engine model
///
/// The engine itself reports nothing but the done bit. These errors come from
/// construction-time validation, the host driver and the verification helpers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Engine or slave configuration is inconsistent
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for rejection
        reason: String,
    },

    /// Host gave up waiting for the done bit
    #[error("Transfer did not complete within {cycles} cycles")]
    Timeout {
        /// Cycle budget that was exhausted
        cycles: u64,
    },

    /// Push into a full elastic buffer (design-rule violation)
    #[error("Elastic buffer overflow (depth {depth} words)")]
    BufferOverflow {
        /// Buffer depth in words
        depth: u32,
    },

    /// Beat accepted with nothing staged to send (design-rule violation)
    #[error("Staging buffer underflow (depth {depth} words)")]
    BufferUnderflow {
        /// Buffer depth in words
        depth: u32,
    },

    /// Register is not decoded by this engine's capability set
    #[error("Register {name} is not mapped on this engine")]
    UnmappedRegister {
        /// Register mnemonic
        name: &'static str,
    },

    /// Destination word differs from the reference model
    #[error("Data mismatch at {address:#010x}: expected {expected:#010x}, got {actual:#010x}")]
    VerificationFailed {
        /// Byte address of the word
        address: u32,
        /// Reference value
        expected: u32,
        /// Value found in memory
        actual: u32,
    },
}

impl EngineError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a timeout error
    pub const fn timeout(cycles: u64) -> Self {
        Self::Timeout { cycles }
    }
}
