// SPDX-License-Identifier: AGPL-3.0-only

//! Memory slave model
//!
//! Word-addressed sparse memory behind both engine ports, with seeded
//! back-pressure injection and a configurable read latency.
//!
//! Two read acceptance modes are modelled:
//!
//! - [`ReadAcceptance::Pipelined`]: commands are accepted whenever the random
//!   stall does not fire, and their data phases queue up in order.
//! - [`ReadAcceptance::SingleOutstanding`]: back-pressure stays high for the
//!   whole data phase of the accepted burst.
//!
//! Writes use burst-start addressing: the slave counts beats within the burst
//! and reconstructs each word address from the held start address.

use std::collections::{HashMap, VecDeque};

use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};
use tracing::{debug, trace};

use crate::bus::{
    BusCommand, BusResponse, BusSlave, DataBeat, ReadPortIn, ReadPortOut, WritePortIn,
    WritePortOut,
};
use crate::error::{EngineError, Result};

// ── Sparse memory ───────────────────────────────────────────────────────────

/// Byte-addressed, word-granular memory; unwritten words read as zero
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseMemory {
    words: HashMap<u32, u32>,
}

impl SparseMemory {
    /// Empty memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Word at `address` (low two bits ignored)
    pub fn read_word(&self, address: u32) -> u32 {
        self.words.get(&(address & !3)).copied().unwrap_or(0)
    }

    /// Store a word at `address` (low two bits ignored)
    pub fn write_word(&mut self, address: u32, value: u32) {
        self.words.insert(address & !3, value);
    }

    /// Store consecutive words from `base`
    pub fn fill(&mut self, base: u32, words: impl IntoIterator<Item = u32>) {
        let mut address = base;
        for word in words {
            self.write_word(address, word);
            address = address.wrapping_add(4);
        }
    }

    /// `count` consecutive words from `base`
    pub fn read_range(&self, base: u32, count: u32) -> Vec<u32> {
        (0..count)
            .map(|i| self.read_word(base.wrapping_add(i * 4)))
            .collect()
    }

    /// Word has been written at least once
    pub fn contains(&self, address: u32) -> bool {
        self.words.contains_key(&(address & !3))
    }

    /// Words ever written
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// No word written
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

// ── Slave configuration ─────────────────────────────────────────────────────

/// How the slave accepts read commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadAcceptance {
    /// Several bursts may be outstanding
    #[default]
    Pipelined,
    /// Back-pressure held for the whole data phase
    SingleOutstanding,
}

/// Memory slave parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaveConfig {
    /// Read acceptance mode
    pub read_acceptance: ReadAcceptance,
    /// Steps from command acceptance to the first data beat (at least 1)
    pub read_latency: u32,
    /// Chance (percent) that a read command or read beat is held off in a step
    pub read_stall_pct: u8,
    /// Chance (percent) that a write beat is refused in a step
    pub write_stall_pct: u8,
    /// Seed of the back-pressure generator
    pub seed: u64,
}

impl SlaveConfig {
    /// Default seed, any value reproduces the same run
    pub const DEFAULT_SEED: u64 = 0x5EED_B0B5;

    /// Zero-stall pipelined slave with one step of read latency
    pub const fn new() -> Self {
        Self {
            read_acceptance: ReadAcceptance::Pipelined,
            read_latency: 1,
            read_stall_pct: 0,
            write_stall_pct: 0,
            seed: Self::DEFAULT_SEED,
        }
    }

    /// Set the read acceptance mode
    #[must_use]
    pub const fn with_read_acceptance(mut self, mode: ReadAcceptance) -> Self {
        self.read_acceptance = mode;
        self
    }

    /// Set the read latency
    #[must_use]
    pub const fn with_read_latency(mut self, steps: u32) -> Self {
        self.read_latency = steps;
        self
    }

    /// Set both stall percentages
    #[must_use]
    pub const fn with_stalls(mut self, read_pct: u8, write_pct: u8) -> Self {
        self.read_stall_pct = read_pct;
        self.write_stall_pct = write_pct;
        self
    }

    /// Set the seed
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the latency is zero or a stall chance is 100% or
    /// more (the slave would never make progress).
    pub fn validate(&self) -> Result<()> {
        if self.read_latency == 0 {
            return Err(EngineError::invalid_config("read latency must be at least 1"));
        }
        if self.read_stall_pct >= 100 || self.write_stall_pct >= 100 {
            return Err(EngineError::invalid_config(format!(
                "stall chances must be below 100% (read {}%, write {}%)",
                self.read_stall_pct, self.write_stall_pct
            )));
        }
        Ok(())
    }
}

impl Default for SlaveConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ── Slave ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct QueuedRead {
    command: BusCommand,
    next_beat: u32,
    ready_at: u64,
}

#[derive(Debug, Clone, Copy)]
struct OpenWrite {
    command: BusCommand,
    beats_done: u32,
}

/// Counters kept by the slave
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlaveStats {
    /// Read commands accepted
    pub read_commands: u64,
    /// Read beats returned
    pub read_beats: u64,
    /// Write bursts started
    pub write_bursts: u64,
    /// Write beats stored
    pub write_beats: u64,
}

/// Memory behind both engine ports
#[derive(Debug, Clone)]
pub struct MemorySlave {
    memory: SparseMemory,
    config: SlaveConfig,
    rng: ChaCha8Rng,
    reads: VecDeque<QueuedRead>,
    write: Option<OpenWrite>,
    stats: SlaveStats,
    cycle: u64,
}

impl MemorySlave {
    /// Slave over `memory`
    ///
    /// # Errors
    ///
    /// Returns error if `config` does not validate.
    pub fn new(memory: SparseMemory, config: SlaveConfig) -> Result<Self> {
        config.validate()?;
        debug!("MemorySlave: {config:?}");
        Ok(Self {
            memory,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            reads: VecDeque::new(),
            write: None,
            stats: SlaveStats::default(),
            cycle: 0,
        })
    }

    /// Zero-stall slave over empty memory
    pub fn ideal() -> Self {
        Self {
            memory: SparseMemory::new(),
            rng: ChaCha8Rng::seed_from_u64(SlaveConfig::DEFAULT_SEED),
            config: SlaveConfig::new(),
            reads: VecDeque::new(),
            write: None,
            stats: SlaveStats::default(),
            cycle: 0,
        }
    }

    /// Backing memory
    pub const fn memory(&self) -> &SparseMemory {
        &self.memory
    }

    /// Backing memory, for preloading
    pub fn memory_mut(&mut self) -> &mut SparseMemory {
        &mut self.memory
    }

    /// Parameters
    pub const fn config(&self) -> &SlaveConfig {
        &self.config
    }

    /// Counters
    pub const fn stats(&self) -> &SlaveStats {
        &self.stats
    }

    /// Read bursts accepted with data still to return
    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }

    /// Give back the memory
    pub fn into_memory(self) -> SparseMemory {
        self.memory
    }

    fn roll(&mut self, pct: u8) -> bool {
        pct > 0 && self.rng.next_u32() % 100 < u32::from(pct)
    }

    fn read_beat(&mut self) -> DataBeat {
        let cycle = self.cycle;
        let Some(front) = self.reads.front().copied() else {
            return DataBeat::IDLE;
        };
        if front.ready_at > cycle {
            return DataBeat::IDLE;
        }
        let stall = self.config.read_stall_pct;
        if self.roll(stall) {
            return DataBeat::IDLE;
        }

        let address = front.command.beat_address(front.next_beat);
        let value = self.memory.read_word(address);
        trace!("slave read {address:#010x} = {value:#x}");
        self.stats.read_beats += 1;

        let next_beat = front.next_beat + 1;
        if next_beat == front.command.burst_length_words {
            self.reads.pop_front();
        } else if let Some(entry) = self.reads.front_mut() {
            entry.next_beat = next_beat;
        }
        DataBeat::valid(value)
    }

    fn read_port(&mut self, out: &ReadPortOut) -> ReadPortIn {
        let beat = self.read_beat();

        let busy = match self.config.read_acceptance {
            ReadAcceptance::Pipelined => false,
            ReadAcceptance::SingleOutstanding => !self.reads.is_empty(),
        };
        let stall = self.config.read_stall_pct;
        let backpressure = busy || (out.request.is_some() && self.roll(stall));

        if let Some(command) = out.request {
            if !backpressure {
                trace!(
                    "slave accepted read {:#010x} x{}",
                    command.address,
                    command.burst_length_words
                );
                self.stats.read_commands += 1;
                self.reads.push_back(QueuedRead {
                    command,
                    next_beat: 0,
                    ready_at: self.cycle + u64::from(self.config.read_latency),
                });
            }
        }

        ReadPortIn { backpressure, beat }
    }

    fn write_port(&mut self, out: &WritePortOut) -> WritePortIn {
        if !out.request {
            return WritePortIn::default();
        }
        let stall = self.config.write_stall_pct;
        if self.roll(stall) {
            return WritePortIn { backpressure: true };
        }

        let mut open = match self.write {
            Some(open) => open,
            None => {
                self.stats.write_bursts += 1;
                OpenWrite {
                    command: out.command,
                    beats_done: 0,
                }
            }
        };
        let address = open.command.beat_address(open.beats_done);
        trace!("slave write {address:#010x} = {:#x}", out.data);
        self.memory.write_word(address, out.data);
        self.stats.write_beats += 1;
        open.beats_done += 1;
        self.write = (open.beats_done < open.command.burst_length_words).then_some(open);

        WritePortIn {
            backpressure: false,
        }
    }
}

impl BusSlave for MemorySlave {
    fn cycle(&mut self, read: &ReadPortOut, write: &WritePortOut) -> BusResponse {
        let response = BusResponse {
            read: self.read_port(read),
            write: self.write_port(write),
        };
        self.cycle += 1;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(address: u32, len: u32) -> ReadPortOut {
        ReadPortOut {
            request: Some(BusCommand::new(address, len)),
        }
    }

    fn idle_read() -> ReadPortOut {
        ReadPortOut::default()
    }

    #[test]
    fn unwritten_memory_reads_zero() {
        let mut mem = SparseMemory::new();
        assert_eq!(mem.read_word(0x40), 0);
        mem.fill(0x40, [1, 2, 3]);
        assert_eq!(mem.read_range(0x40, 4), vec![1, 2, 3, 0]);
        assert_eq!(mem.read_word(0x45), 2);
        assert!(mem.contains(0x48));
        assert!(!mem.contains(0x4C));
        assert_eq!(mem.len(), 3);
    }

    #[test]
    fn read_data_follows_latency_in_order() {
        let mut mem = SparseMemory::new();
        mem.fill(0x100, [0xA, 0xB, 0xC, 0xD]);
        let mut slave =
            MemorySlave::new(mem, SlaveConfig::new().with_read_latency(2)).unwrap();
        let idle_write = WritePortOut::IDLE;

        let r = slave.cycle(&request(0x100, 2), &idle_write);
        assert!(!r.read.backpressure);
        assert!(!r.read.beat.valid);
        let r = slave.cycle(&request(0x108, 2), &idle_write);
        assert!(!r.read.beat.valid);

        let mut beats = Vec::new();
        for _ in 0..6 {
            let r = slave.cycle(&idle_read(), &idle_write);
            if r.read.beat.valid {
                beats.push(r.read.beat.value);
            }
        }
        assert_eq!(beats, vec![0xA, 0xB, 0xC, 0xD]);
        assert_eq!(slave.stats().read_commands, 2);
    }

    #[test]
    fn single_outstanding_holds_backpressure_during_data_phase() {
        let mut slave = MemorySlave::new(
            SparseMemory::new(),
            SlaveConfig::new().with_read_acceptance(ReadAcceptance::SingleOutstanding),
        )
        .unwrap();
        let idle_write = WritePortOut::IDLE;
        assert!(!slave.cycle(&request(0, 2), &idle_write).read.backpressure);
        // data phase: beat at step 1 and 2
        let r = slave.cycle(&request(8, 2), &idle_write);
        assert!(r.read.backpressure);
        assert!(r.read.beat.valid);
        let r = slave.cycle(&request(8, 2), &idle_write);
        assert!(r.read.beat.valid);
        assert!(!r.read.backpressure);
        assert_eq!(slave.pending_reads(), 1);
    }

    #[test]
    fn write_uses_burst_start_address() {
        let mut slave = MemorySlave::ideal();
        let cmd = BusCommand::new(0x5000, 3);
        for data in [7, 8, 9] {
            let out = WritePortOut {
                command: cmd,
                request: true,
                data,
            };
            assert!(!slave.cycle(&idle_read(), &out).write.backpressure);
        }
        assert_eq!(slave.memory().read_range(0x5000, 3), vec![7, 8, 9]);
        assert_eq!(slave.stats().write_bursts, 1);
    }

    #[test]
    fn stalls_are_reproducible() {
        let config = SlaveConfig::new().with_stalls(30, 30).with_seed(42);
        let pattern = |config: SlaveConfig| {
            let mut slave = MemorySlave::new(SparseMemory::new(), config).unwrap();
            let out = WritePortOut {
                command: BusCommand::new(0, 64),
                request: true,
                data: 1,
            };
            (0..64)
                .map(|_| slave.cycle(&idle_read(), &out).write.backpressure)
                .collect::<Vec<_>>()
        };
        let a = pattern(config);
        assert_eq!(a, pattern(config));
        assert!(a.iter().any(|&b| b));
        assert!(a.iter().any(|&b| !b));
    }

    #[test]
    fn invalid_slave_config_rejected() {
        assert!(SlaveConfig::new().with_read_latency(0).validate().is_err());
        assert!(SlaveConfig::new().with_stalls(100, 0).validate().is_err());
    }
}
