//! Host-side driver
//!
//! Drives the CSR port the way control software would: one register access
//! per step, status polling at a fixed interval and a cycle budget on every
//! wait. The engine and the slave behind it advance together.

use burst_chip::regs::{self, Register};
use tracing::{debug, info};

use crate::bus::BusSlave;
use crate::engine::{BurstEngine, CsrRequest, StepReport};
use crate::error::{EngineError, Result};
use crate::stats::TransferStats;

/// Steps between two STATUS reads while waiting
pub const DEFAULT_POLL_INTERVAL: u64 = 10;

/// Cycle budget used by [`Host::run`]
pub const DEFAULT_TIMEOUT_CYCLES: u64 = 100_000;

/// One transfer as the host programs it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferRequest {
    /// Source base address
    pub source_address: u32,
    /// Destination base address
    pub destination_address: u32,
    /// Requested length (bytes)
    pub length_bytes: u32,
    /// RD_BURST value, written only if set
    pub read_burst_words: Option<u32>,
    /// WR_BURST value, written only if set
    pub write_burst_words: Option<u32>,
    /// COEFF value, written only if set
    pub coefficient: Option<u32>,
}

impl TransferRequest {
    /// Plain copy request
    pub const fn new(source_address: u32, destination_address: u32, length_bytes: u32) -> Self {
        Self {
            source_address,
            destination_address,
            length_bytes,
            read_burst_words: None,
            write_burst_words: None,
            coefficient: None,
        }
    }

    /// Also program RD_BURST
    #[must_use]
    pub const fn with_read_burst(mut self, words: u32) -> Self {
        self.read_burst_words = Some(words);
        self
    }

    /// Also program WR_BURST
    #[must_use]
    pub const fn with_write_burst(mut self, words: u32) -> Self {
        self.write_burst_words = Some(words);
        self
    }

    /// Also program COEFF
    #[must_use]
    pub const fn with_coefficient(mut self, coefficient: u32) -> Self {
        self.coefficient = Some(coefficient);
        self
    }
}

/// Control software plus the bus it sits on
#[derive(Debug)]
pub struct Host<S: BusSlave> {
    engine: BurstEngine,
    slave: S,
    poll_interval: u64,
}

impl<S: BusSlave> Host<S> {
    /// Host driving `engine`, whose ports connect to `slave`
    pub const fn new(engine: BurstEngine, slave: S) -> Self {
        Self {
            engine,
            slave,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the status polling interval (steps, at least 1)
    #[must_use]
    pub fn with_poll_interval(mut self, steps: u64) -> Self {
        self.poll_interval = steps.max(1);
        self
    }

    /// The engine
    pub const fn engine(&self) -> &BurstEngine {
        &self.engine
    }

    /// The engine, mutably
    pub fn engine_mut(&mut self) -> &mut BurstEngine {
        &mut self.engine
    }

    /// The slave
    pub const fn slave(&self) -> &S {
        &self.slave
    }

    /// The slave, mutably
    pub fn slave_mut(&mut self) -> &mut S {
        &mut self.slave
    }

    /// Split into engine and slave
    pub fn into_parts(self) -> (BurstEngine, S) {
        (self.engine, self.slave)
    }

    fn step(&mut self, request: CsrRequest) -> Result<StepReport> {
        self.engine.step(request, &mut self.slave)
    }

    /// Let `steps` steps pass without a CSR access
    ///
    /// # Errors
    ///
    /// Propagates engine step errors.
    pub fn idle(&mut self, steps: u64) -> Result<()> {
        for _ in 0..steps {
            self.step(CsrRequest::Idle)?;
        }
        Ok(())
    }

    /// Write a register by index (one step)
    ///
    /// # Errors
    ///
    /// Propagates engine step errors.
    pub fn write_csr(&mut self, index: u32, value: u32) -> Result<()> {
        self.step(CsrRequest::Write { index, value })?;
        Ok(())
    }

    /// Read a register by index (one step, data sampled after the edge)
    ///
    /// # Errors
    ///
    /// Propagates engine step errors.
    pub fn read_csr(&mut self, index: u32) -> Result<u32> {
        let report = self.step(CsrRequest::Read { index })?;
        Ok(report.csr_readdata.unwrap_or(0))
    }

    fn index_of(&self, register: Register) -> Result<u32> {
        self.engine
            .registers()
            .layout()
            .index_of(register)
            .ok_or(EngineError::UnmappedRegister {
                name: register.name(),
            })
    }

    /// Write a named register
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnmappedRegister`] if this engine does not
    /// decode `register`.
    pub fn write_register(&mut self, register: Register, value: u32) -> Result<()> {
        let index = self.index_of(register)?;
        self.write_csr(index, value)
    }

    /// Read a named register
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnmappedRegister`] if this engine does not
    /// decode `register`.
    pub fn read_register(&mut self, register: Register) -> Result<u32> {
        let index = self.index_of(register)?;
        self.read_csr(index)
    }

    /// Program every register of `request`
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnmappedRegister`] if the request sets a burst
    /// size or coefficient this engine does not have.
    pub fn configure(&mut self, request: &TransferRequest) -> Result<()> {
        // Burst sizes first so LENGTH pads against the final read burst.
        if let Some(words) = request.read_burst_words {
            self.write_register(Register::ReadBurst, words)?;
        }
        if let Some(words) = request.write_burst_words {
            self.write_register(Register::WriteBurst, words)?;
        }
        if let Some(coefficient) = request.coefficient {
            self.write_register(Register::Coefficient, coefficient)?;
        }
        self.write_register(Register::SrcAddr, request.source_address)?;
        self.write_register(Register::DstAddr, request.destination_address)?;
        self.write_register(Register::Length, request.length_bytes)?;
        debug!("host configured {request:?}");
        Ok(())
    }

    /// Pulse CONTROL.start
    ///
    /// # Errors
    ///
    /// Propagates engine step errors.
    pub fn start(&mut self) -> Result<()> {
        self.write_register(Register::Control, regs::control::START)
    }

    /// Poll STATUS until done is set. Returns the cycles waited.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Timeout`] once `timeout_cycles` steps have
    /// passed without the done bit.
    pub fn wait_done(&mut self, timeout_cycles: u64) -> Result<u64> {
        if timeout_cycles == 0 {
            return Err(EngineError::timeout(0));
        }
        let mut waited = 0;
        loop {
            let status = self.read_register(Register::Status)?;
            waited += 1;
            if status & regs::status::DONE != 0 {
                debug!("done after {waited} cycles");
                return Ok(waited);
            }
            if waited >= timeout_cycles {
                return Err(EngineError::timeout(timeout_cycles));
            }
            let pause = (self.poll_interval - 1).min(timeout_cycles - waited - 1);
            self.idle(pause)?;
            waited += pause;
        }
    }

    /// Write 1 to STATUS.done
    ///
    /// # Errors
    ///
    /// Propagates engine step errors.
    pub fn clear_done(&mut self) -> Result<()> {
        self.write_register(Register::Status, regs::status::DONE)
    }

    /// Configure, start, wait and clear. Returns the transfer counters.
    ///
    /// # Errors
    ///
    /// Returns any error of [`configure`](Self::configure) or
    /// [`wait_done`](Self::wait_done).
    pub fn run(&mut self, request: &TransferRequest, timeout_cycles: u64) -> Result<TransferStats> {
        self.configure(request)?;
        self.start()?;
        let waited = self.wait_done(timeout_cycles)?;
        self.clear_done()?;
        let stats = *self.engine.stats();
        info!(
            "transfer finished: {} words in {} cycles (host waited {waited})",
            stats.words_written, stats.cycles
        );
        Ok(stats)
    }
}
