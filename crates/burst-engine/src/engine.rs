//! Top-level wiring of the burst engine
//!
//! [`BurstEngine::step`] is one clock edge. Inside a step the order is fixed:
//!
//! 1. CSR access (read sampled before anything changes)
//! 2. master outputs
//! 3. slave response ([`BusSlave::cycle`])
//! 4. read master update
//! 5. write master update
//! 6. transform pipeline advance
//! 7. controller completion check

use burst_chip::Register;
use tracing::debug;

use crate::bus::BusSlave;
use crate::config::EngineConfig;
use crate::controller::{ControllerState, TransferController, TransferPlan, Transition};
use crate::csr::{CsrEvent, RegisterFile, TransferConfig};
use crate::error::Result;
use crate::fifo::ElasticBuffer;
use crate::read_master::{ReadMaster, ReadState};
use crate::stats::{TransferProgress, TransferStats};
use crate::transform::TransformPipeline;
use crate::write_master::{WriteMaster, WriteState};

/// Control-plane access presented to the CSR port in one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsrRequest {
    /// No access
    #[default]
    Idle,
    /// Read a register
    Read {
        /// Word index
        index: u32,
    },
    /// Write a register
    Write {
        /// Word index
        index: u32,
        /// Value
        value: u32,
    },
}

/// Outputs of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    /// Read data, valid for a [`CsrRequest::Read`] issued this step
    pub csr_readdata: Option<u32>,
    /// Controller state after the edge
    pub state: ControllerState,
    /// STATUS.done was raised on this edge
    pub done_raised: bool,
}

/// Cycle model of the burst transfer engine
#[derive(Debug, Clone)]
pub struct BurstEngine {
    config: EngineConfig,
    csr: RegisterFile,
    controller: TransferController,
    read: ReadMaster,
    write: WriteMaster,
    buffer: ElasticBuffer,
    pipeline: TransformPipeline,
    stats: TransferStats,
    total_words: u32,
    cycle: u64,
}

impl BurstEngine {
    /// Instantiate an engine
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`](crate::EngineError::InvalidConfig)
    /// if the configuration does not validate.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let depth = config.buffer_depth_words;
        debug!("BurstEngine: {:?}, {depth}-word buffers", config.capabilities);
        Ok(Self {
            csr: RegisterFile::new(&config),
            controller: TransferController::new(),
            read: ReadMaster::new(config.capabilities.single_outstanding_read),
            write: WriteMaster::new(),
            buffer: ElasticBuffer::new(depth),
            pipeline: TransformPipeline::new(&config.capabilities, depth),
            stats: TransferStats::default(),
            total_words: 0,
            cycle: 0,
            config,
        })
    }

    /// Instantiation parameters
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Controller state
    pub const fn state(&self) -> ControllerState {
        self.controller.state()
    }

    /// Read master state
    pub const fn read_state(&self) -> ReadState {
        self.read.state()
    }

    /// Write master state
    pub const fn write_state(&self) -> WriteState {
        self.write.state()
    }

    /// Steps since construction or reset
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Counters of the current or last transfer
    pub const fn stats(&self) -> &TransferStats {
        &self.stats
    }

    /// Plan of the current or last transfer
    pub const fn plan(&self) -> Option<&TransferPlan> {
        self.controller.plan()
    }

    /// Register-file configuration
    pub const fn transfer_config(&self) -> &TransferConfig {
        self.csr.config()
    }

    /// Register file (index decode, current values)
    pub const fn registers(&self) -> &RegisterFile {
        &self.csr
    }

    /// Read and write progress of the current or last transfer
    pub const fn progress(&self) -> TransferProgress {
        TransferProgress {
            total_words: self.total_words,
            words_read: self.read.words_completed(),
            words_written: self.write.words_written(),
        }
    }

    /// Elastic buffer occupancy (words)
    pub fn buffer_occupancy(&self) -> u32 {
        self.buffer.len()
    }

    /// Register value without a bus access; `None` if not mapped
    pub fn peek(&self, register: Register) -> Option<u32> {
        self.csr
            .layout()
            .index_of(register)
            .map(|index| self.csr.read(index))
    }

    /// Synchronous reset of every component
    pub fn reset(&mut self) {
        debug!("BurstEngine reset");
        self.csr.reset();
        self.controller.reset();
        self.read.reset();
        self.write.reset();
        self.buffer.clear();
        self.pipeline.load(self.config.reset_coefficient);
        self.stats = TransferStats::default();
        self.total_words = 0;
        self.cycle = 0;
    }

    /// Advance one clock edge
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BufferOverflow`](crate::EngineError::BufferOverflow)
    /// if a buffer push finds no room, or
    /// [`EngineError::BufferUnderflow`](crate::EngineError::BufferUnderflow)
    /// if a write beat is accepted with nothing staged. The credit rules
    /// make both unreachable; they are reported rather than losing data.
    pub fn step<S: BusSlave + ?Sized>(&mut self, csr: CsrRequest, bus: &mut S) -> Result<StepReport> {
        let csr_readdata = self.csr_access(csr);

        let read_out = self.read.outputs();
        let write_out = self.write.outputs(self.pipeline.staging());
        let response = bus.cycle(&read_out, &write_out);

        self.read
            .update(&response.read, &mut self.buffer, &mut self.stats)?;
        self.write
            .update(&response.write, self.pipeline.staging_mut(), &mut self.stats)?;
        self.pipeline.advance(&mut self.buffer)?;

        if self.controller.state().is_active() {
            self.stats.cycles += 1;
            self.stats.peak_buffer_occupancy = self.buffer.peak_occupancy();
            self.stats.peak_staging_occupancy = self.pipeline.staging().peak_occupancy();
        }

        let done_raised = match self.controller.advance(&self.progress()) {
            Transition::Launched(plan) => {
                self.launch(&plan);
                false
            }
            Transition::Completed => {
                self.csr.set_done();
                true
            }
            Transition::None => false,
        };
        self.csr.set_busy(self.controller.state().is_active());
        self.cycle += 1;

        Ok(StepReport {
            csr_readdata,
            state: self.controller.state(),
            done_raised,
        })
    }

    fn csr_access(&mut self, request: CsrRequest) -> Option<u32> {
        match request {
            CsrRequest::Idle => None,
            CsrRequest::Read { index } => Some(self.csr.read(index)),
            CsrRequest::Write { index, value } => {
                let active = self.controller.state().is_active();
                match self.csr.write(index, value, active) {
                    CsrEvent::Start => {
                        if self.controller.start(self.csr.config()) {
                            self.stats = TransferStats::default();
                            self.total_words = 0;
                        }
                    }
                    CsrEvent::DoneCleared => self.controller.clear(),
                    CsrEvent::None => {}
                }
                None
            }
        }
    }

    fn launch(&mut self, plan: &TransferPlan) {
        let total = plan.total_words();
        self.total_words = total;
        self.buffer.clear();
        self.pipeline.load(plan.coefficient);
        self.write
            .start(plan.destination_address, plan.write_burst_words, total);
        self.read.start(
            plan.source_address,
            plan.read_burst_words,
            total,
            &self.buffer,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusResponse, ReadPortOut, WritePortOut};
    use burst_chip::regs::{self, CONTROL, LENGTH, STATUS};

    /// Accepts everything, never returns data
    struct Sink;

    impl BusSlave for Sink {
        fn cycle(&mut self, _: &ReadPortOut, _: &WritePortOut) -> BusResponse {
            BusResponse::default()
        }
    }

    fn write(engine: &mut BurstEngine, index: u32, value: u32) -> StepReport {
        engine
            .step(CsrRequest::Write { index, value }, &mut Sink)
            .unwrap()
    }

    #[test]
    fn invalid_config_rejected() {
        let cfg = EngineConfig::default().with_buffer_depth(3);
        assert!(BurstEngine::new(cfg).is_err());
    }

    #[test]
    fn csr_read_returns_same_step() {
        let mut e = BurstEngine::new(EngineConfig::default()).unwrap();
        write(&mut e, LENGTH, 10);
        let report = e
            .step(CsrRequest::Read { index: LENGTH }, &mut Sink)
            .unwrap();
        assert_eq!(report.csr_readdata, Some(1024));
        assert_eq!(e.peek(Register::Length), Some(1024));
    }

    #[test]
    fn zero_length_sets_done_and_busy_clears() {
        let mut e = BurstEngine::new(EngineConfig::default()).unwrap();
        let report = write(&mut e, CONTROL, regs::control::START);
        assert!(report.done_raised);
        assert_eq!(report.state, ControllerState::Done);
        assert_eq!(e.peek(Register::Status), Some(regs::status::DONE));
        write(&mut e, STATUS, regs::status::DONE);
        assert_eq!(e.state(), ControllerState::Idle);
        assert_eq!(e.peek(Register::Status), Some(0));
    }

    #[test]
    fn starved_transfer_stays_busy() {
        let mut e = BurstEngine::new(EngineConfig::default()).unwrap();
        write(&mut e, LENGTH, 64);
        write(&mut e, CONTROL, regs::control::START);
        for _ in 0..16 {
            e.step(CsrRequest::Idle, &mut Sink).unwrap();
        }
        assert_eq!(e.state(), ControllerState::Running);
        assert_eq!(e.peek(Register::Status), Some(regs::status::BUSY));
        assert_eq!(e.progress().words_read, 0);
    }
}
