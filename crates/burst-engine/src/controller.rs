//! Transfer controller (top-level FSM)
//!
//! ```text
//!   Idle ──start──► Configured ──► Running ──► Done ──clear──► Idle
//!                        │                      ▲
//!                        └──(zero length)───────┘
//! ```

use std::fmt;

use burst_chip::regs::WORD_BYTES;
use tracing::{debug, info, warn};

use crate::csr::TransferConfig;
use crate::stats::TransferProgress;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// Waiting for start
    #[default]
    Idle,
    /// Plan latched, masters armed at the end of this step
    Configured,
    /// Masters moving data
    Running,
    /// Transfer complete, waiting for the done bit to be cleared
    Done,
}

impl ControllerState {
    /// Configured or Running
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Configured | Self::Running)
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Configured => "configured",
            Self::Running => "running",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// Everything the masters need for one transfer, derived at start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPlan {
    /// Source base address
    pub source_address: u32,
    /// Destination base address
    pub destination_address: u32,
    /// Padded length (bytes)
    pub effective_length_bytes: u32,
    /// Read burst size (words)
    pub read_burst_words: u32,
    /// Write burst size (words)
    pub write_burst_words: u32,
    /// `effective / (rd * 4)`
    pub read_bursts: u32,
    /// `ceil(effective / (wr * 4))`
    pub write_bursts: u32,
    /// Transform coefficient
    pub coefficient: u32,
}

impl TransferPlan {
    /// Plan for a register configuration; `None` if the padded length does
    /// not fit 32 bits or a burst size is zero.
    pub const fn from_config(config: &TransferConfig) -> Option<Self> {
        let Some(effective) = config.effective_length_bytes() else {
            return None;
        };
        if config.read_burst_words == 0 || config.write_burst_words == 0 {
            return None;
        }
        let read_unit = config.read_burst_words * WORD_BYTES;
        let write_unit = config.write_burst_words.saturating_mul(WORD_BYTES);
        Some(Self {
            source_address: config.source_address,
            destination_address: config.destination_address,
            effective_length_bytes: effective,
            read_burst_words: config.read_burst_words,
            write_burst_words: config.write_burst_words,
            read_bursts: effective / read_unit,
            write_bursts: effective.div_ceil(write_unit),
            coefficient: config.coefficient,
        })
    }

    /// Words moved by the transfer
    pub const fn total_words(&self) -> u32 {
        self.effective_length_bytes / WORD_BYTES
    }
}

/// What the engine must do after [`TransferController::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No change
    None,
    /// Entered Running: arm the masters with this plan
    Launched(TransferPlan),
    /// Entered Done: raise STATUS.done
    Completed,
}

/// Top-level sequencer
#[derive(Debug, Clone, Default)]
pub struct TransferController {
    state: ControllerState,
    plan: Option<TransferPlan>,
}

impl TransferController {
    /// Idle controller
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// Plan of the current or last transfer
    pub const fn plan(&self) -> Option<&TransferPlan> {
        self.plan.as_ref()
    }

    /// Handle a start pulse. Returns true if a transfer was accepted.
    pub fn start(&mut self, config: &TransferConfig) -> bool {
        if self.state != ControllerState::Idle {
            debug!("start ignored in state {}", self.state);
            return false;
        }
        let Some(plan) = TransferPlan::from_config(config) else {
            warn!("start ignored: configuration cannot be planned: {config:?}");
            return false;
        };
        info!(
            "transfer start: {:#010x} -> {:#010x}, {} bytes ({} requested), rd={} wr={}",
            plan.source_address,
            plan.destination_address,
            plan.effective_length_bytes,
            config.requested_length_bytes,
            plan.read_burst_words,
            plan.write_burst_words
        );
        debug!(
            "plan: {} read bursts, {} write bursts",
            plan.read_bursts, plan.write_bursts
        );
        self.plan = Some(plan);
        self.state = ControllerState::Configured;
        true
    }

    /// Handle a STATUS.done clear
    pub fn clear(&mut self) {
        if self.state == ControllerState::Done {
            debug!("controller: done -> idle");
            self.state = ControllerState::Idle;
        }
    }

    /// End-of-step completion check
    pub fn advance(&mut self, progress: &TransferProgress) -> Transition {
        match (self.state, self.plan) {
            (ControllerState::Configured, Some(plan)) => {
                if plan.total_words() == 0 {
                    info!("transfer complete: zero length");
                    self.state = ControllerState::Done;
                    Transition::Completed
                } else {
                    debug!("controller: configured -> running");
                    self.state = ControllerState::Running;
                    Transition::Launched(plan)
                }
            }
            (ControllerState::Running, Some(plan)) => {
                if progress.total_words == plan.total_words() && progress.is_complete() {
                    info!("transfer complete: {} words", plan.total_words());
                    self.state = ControllerState::Done;
                    Transition::Completed
                } else {
                    Transition::None
                }
            }
            _ => Transition::None,
        }
    }

    /// Back to Idle, forgetting the plan
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
