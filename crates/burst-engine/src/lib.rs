//! Cycle model of a memory-to-memory burst DMA engine.
//!
//! One call to [`BurstEngine::step`] is one clock edge. The engine talks to
//! the outside world through two ports: a CSR port (one [`CsrRequest`] per
//! step) and a split read/write bus master port behind the [`BusSlave`]
//! trait.
//!
//! # Data path
//!
//! ```text
//!  source ──► ReadMaster ──► ElasticBuffer ──► TransformPipeline ──► staging ──► WriteMaster ──► destination
//!                 ▲                                                                   ▲
//!                 └────────────── TransferController ◄── RegisterFile (CSR) ──────────┘
//! ```
//!
//! # Quick start
//!
//! ```
//! use burst_chip::Variant;
//! use burst_engine::{BurstEngine, EngineConfig, Host, MemorySlave, TransferRequest};
//!
//! # fn main() -> burst_engine::Result<()> {
//! let engine = BurstEngine::new(EngineConfig::for_variant(Variant::Pipelined))?;
//! let mut host = Host::new(engine, MemorySlave::ideal());
//! host.slave_mut().memory_mut().fill(0x1000, (0..512).map(|i| 0xA000 + i));
//!
//! let stats = host.run(&TransferRequest::new(0x1000, 0x5000, 2048), 100_000)?;
//! assert_eq!(stats.words_written, 512);
//! assert_eq!(host.slave().memory().read_word(0x5000), 0xA000);
//! # Ok(())
//! # }
//! ```
//!
//! Around the engine, the crate ships the collaborators needed to run it end
//! to end: a [`MemorySlave`] with seeded back-pressure, a [`Host`] that polls
//! STATUS like control software would, and a [`ReferenceModel`] giving the
//! expected destination image.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod bus;
mod config;
pub mod controller;
pub mod csr;
mod engine;
mod error;
pub mod fifo;
mod host;
pub mod memory;
pub mod read_master;
mod reference;
mod stats;
pub mod transform;
pub mod write_master;

pub use bus::{BusCommand, BusResponse, BusSlave, DataBeat};
pub use config::EngineConfig;
pub use controller::{ControllerState, TransferPlan};
pub use csr::{RegisterFile, TransferConfig};
pub use engine::{BurstEngine, CsrRequest, StepReport};
pub use error::{EngineError, Result};
pub use fifo::ElasticBuffer;
pub use host::{Host, TransferRequest, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT_CYCLES};
pub use memory::{MemorySlave, ReadAcceptance, SlaveConfig, SparseMemory};
pub use reference::ReferenceModel;
pub use stats::{TransferProgress, TransferStats};
pub use transform::TransformPipeline;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        BurstEngine, ControllerState, CsrRequest, EngineConfig, EngineError, Host, MemorySlave,
        ReferenceModel, Result, SlaveConfig, SparseMemory, TransferRequest, TransferStats,
    };
    pub use burst_chip::{Capabilities, Register, Variant};
}
