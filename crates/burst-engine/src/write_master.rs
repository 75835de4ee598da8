//! Write master
//!
//! Drains the staging buffer into the destination range, one burst at a time.
//! A burst is only started once the staging buffer holds all of its words, so
//! the data phase never starves. The first beat travels with the address
//! phase; the burst start address is held for every beat.

use tracing::{debug, trace};

use crate::bus::{BusCommand, WritePortIn, WritePortOut};
use crate::error::{EngineError, Result};
use crate::fifo::ElasticBuffer;
use crate::stats::TransferStats;

/// Write master FSM state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteState {
    /// No burst in progress
    #[default]
    Idle,
    /// First beat and address presented this step
    Request,
    /// First beat held against back-pressure
    WaitAccept,
    /// Remaining beats of the burst
    Send,
}

/// Write side of the engine
#[derive(Debug, Clone, Default)]
pub struct WriteMaster {
    state: WriteState,
    destination: u32,
    burst_words: u32,
    words_to_issue: u32,
    written_bytes: u32,
    words_written: u32,
    command: BusCommand,
    beats_left: u32,
}

impl WriteMaster {
    /// Idle master
    pub fn new() -> Self {
        Self::default()
    }

    /// Current FSM state
    pub const fn state(&self) -> WriteState {
        self.state
    }

    /// Beats accepted by the destination
    pub const fn words_written(&self) -> u32 {
        self.words_written
    }

    /// Every burst issued and fully sent
    pub fn is_finished(&self) -> bool {
        self.words_to_issue == 0 && self.state == WriteState::Idle
    }

    /// Arm the master for a new transfer
    pub fn start(&mut self, destination: u32, burst_words: u32, total_words: u32) {
        *self = Self {
            destination,
            burst_words,
            words_to_issue: total_words,
            ..Self::default()
        };
    }

    /// Drop everything in flight
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn requesting(&self) -> bool {
        self.state != WriteState::Idle
    }

    /// Bus outputs for this step; the data word is the staging buffer head.
    pub fn outputs(&self, staging: &ElasticBuffer) -> WritePortOut {
        if !self.requesting() {
            return WritePortOut::IDLE;
        }
        // bursts are issued fully staged; an empty staging buffer here is
        // reported by `update`
        match staging.front() {
            Some(data) => WritePortOut {
                command: self.command,
                request: true,
                data,
            },
            None => WritePortOut::IDLE,
        }
    }

    /// Sample the bus at the edge, then start the next burst if one is ready.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BufferUnderflow`] if a beat is accepted while
    /// the staging buffer is empty. No word is invented for it.
    pub fn update(
        &mut self,
        input: &WritePortIn,
        staging: &mut ElasticBuffer,
        stats: &mut TransferStats,
    ) -> Result<()> {
        if self.requesting() {
            if input.backpressure {
                stats.write_stall_cycles += 1;
                if self.state == WriteState::Request {
                    self.state = WriteState::WaitAccept;
                }
            } else {
                if matches!(self.state, WriteState::Request | WriteState::WaitAccept) {
                    stats.write_commands += 1;
                }
                let word = staging.pop().ok_or(EngineError::BufferUnderflow {
                    depth: staging.depth(),
                })?;
                trace!(
                    "write beat {:#010x} = {word:#x}",
                    self.command
                        .beat_address(self.command.burst_length_words - self.beats_left)
                );
                stats.words_written += 1;
                self.words_written += 1;
                self.beats_left -= 1;
                if self.beats_left == 0 {
                    debug!("write burst complete: {:#010x}", self.command.address);
                    self.written_bytes = self
                        .written_bytes
                        .wrapping_add(self.command.burst_length_words * 4);
                    self.state = WriteState::Idle;
                } else {
                    self.state = WriteState::Send;
                }
            }
        }

        if self.state == WriteState::Idle && self.words_to_issue > 0 {
            let length = self.burst_words.min(self.words_to_issue);
            if staging.len() >= length {
                let cmd = BusCommand::new(self.destination.wrapping_add(self.written_bytes), length);
                debug!("write burst issued: {:#010x} x{length}", cmd.address);
                self.command = cmd;
                self.beats_left = length;
                self.words_to_issue -= length;
                self.state = WriteState::Request;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged(words: &[u32]) -> ElasticBuffer {
        let mut buf = ElasticBuffer::new(16);
        for &w in words {
            buf.push(w).unwrap();
        }
        buf
    }

    const GO: WritePortIn = WritePortIn {
        backpressure: false,
    };
    const STALL: WritePortIn = WritePortIn { backpressure: true };

    #[test]
    fn waits_for_full_burst() {
        let mut staging = staged(&[1, 2, 3]);
        let mut stats = TransferStats::default();
        let mut wm = WriteMaster::new();
        wm.start(0x5000, 4, 8);
        wm.update(&GO, &mut staging, &mut stats).unwrap();
        assert_eq!(wm.state(), WriteState::Idle);
        assert!(!wm.outputs(&staging).request);

        staging.push(4).unwrap();
        wm.update(&GO, &mut staging, &mut stats).unwrap();
        let out = wm.outputs(&staging);
        assert!(out.request);
        assert_eq!(out.command, BusCommand::new(0x5000, 4));
        assert_eq!(out.data, 1);
    }

    #[test]
    fn address_held_for_whole_burst() {
        let mut staging = staged(&[10, 20]);
        let mut stats = TransferStats::default();
        let mut wm = WriteMaster::new();
        wm.start(0x5000, 2, 2);
        wm.update(&GO, &mut staging, &mut stats).unwrap();

        let mut seen = Vec::new();
        for input in [STALL, GO, STALL, GO] {
            let out = wm.outputs(&staging);
            seen.push((out.command.address, out.data));
            wm.update(&input, &mut staging, &mut stats).unwrap();
        }
        assert_eq!(
            seen,
            vec![(0x5000, 10), (0x5000, 10), (0x5000, 20), (0x5000, 20)]
        );
        assert_eq!(stats.write_stall_cycles, 2);
        assert_eq!(stats.write_commands, 1);
        assert!(wm.is_finished());
        assert_eq!(wm.words_written(), 2);
    }

    #[test]
    fn final_burst_clamped() {
        let mut staging = staged(&[1, 2, 3, 4, 5, 6]);
        let mut stats = TransferStats::default();
        let mut wm = WriteMaster::new();
        wm.start(0, 4, 6);
        wm.update(&GO, &mut staging, &mut stats).unwrap();
        for _ in 0..4 {
            wm.update(&GO, &mut staging, &mut stats).unwrap();
        }
        assert_eq!(wm.outputs(&staging).command, BusCommand::new(16, 2));
        wm.update(&GO, &mut staging, &mut stats).unwrap();
        wm.update(&GO, &mut staging, &mut stats).unwrap();
        assert!(wm.is_finished());
        assert_eq!(stats.write_commands, 2);
        assert!(staging.is_empty());
    }

    #[test]
    fn accepted_beat_without_staged_word_is_reported() {
        let mut staging = staged(&[7, 8]);
        let mut stats = TransferStats::default();
        let mut wm = WriteMaster::new();
        wm.start(0x5000, 2, 2);
        wm.update(&GO, &mut staging, &mut stats).unwrap();
        assert!(wm.outputs(&staging).request);

        staging.clear();
        assert_eq!(wm.outputs(&staging), WritePortOut::IDLE);
        assert_eq!(
            wm.update(&GO, &mut staging, &mut stats),
            Err(EngineError::BufferUnderflow { depth: 16 })
        );
        assert_eq!(stats.words_written, 0);
    }
}
