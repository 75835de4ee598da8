//! Read master
//!
//! Issues read bursts from the source range and pushes the returned beats into
//! the elastic buffer.
//!
//! ```text
//!   Idle ──► Request ──(backpressure)──► WaitAccept
//!              │                             │
//!              └────────(accepted)───────────┴──► Receive ──► Idle | Request
//! ```
//!
//! A pipelined master may hold several bursts in flight as long as the buffer
//! can absorb every beat it is still owed. A single-outstanding master waits
//! for the whole data phase before it asks again.

use std::collections::VecDeque;

use tracing::{debug, trace, warn};

use crate::bus::{BusCommand, ReadPortIn, ReadPortOut};
use crate::error::Result;
use crate::fifo::ElasticBuffer;
use crate::stats::TransferStats;

/// Read master FSM state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadState {
    /// Nothing in flight, nothing to ask for
    #[default]
    Idle,
    /// Request strobe raised this step
    Request,
    /// Request held against back-pressure
    WaitAccept,
    /// Data phase of accepted bursts in progress, strobe low
    Receive,
}

/// Accepted burst whose data phase is not finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingBurst {
    address: u32,
    length: u32,
    remaining_beats: u32,
}

/// Read side of the engine
#[derive(Debug, Clone, Default)]
pub struct ReadMaster {
    state: ReadState,
    single_outstanding: bool,
    source: u32,
    burst_words: u32,
    words_to_issue: u32,
    issued_bytes: u32,
    words_completed: u32,
    command: Option<BusCommand>,
    pending: VecDeque<PendingBurst>,
}

impl ReadMaster {
    /// Idle master
    pub fn new(single_outstanding: bool) -> Self {
        Self {
            single_outstanding,
            ..Self::default()
        }
    }

    /// Current FSM state
    pub const fn state(&self) -> ReadState {
        self.state
    }

    /// Words whose burst has fully arrived
    pub const fn words_completed(&self) -> u32 {
        self.words_completed
    }

    /// Bursts accepted but not fully received
    pub fn outstanding_bursts(&self) -> usize {
        self.pending.len()
    }

    /// All bursts issued and received
    pub fn is_finished(&self) -> bool {
        self.words_to_issue == 0 && self.pending.is_empty() && self.command.is_none()
    }

    /// Arm the master for a new transfer and raise the first request if the
    /// buffer allows it.
    pub fn start(&mut self, source: u32, burst_words: u32, total_words: u32, buffer: &ElasticBuffer) {
        self.source = source;
        self.burst_words = burst_words;
        self.words_to_issue = total_words;
        self.issued_bytes = 0;
        self.words_completed = 0;
        self.command = None;
        self.pending.clear();
        self.state = ReadState::Idle;
        self.try_issue(buffer);
    }

    /// Drop everything in flight
    pub fn reset(&mut self) {
        *self = Self::new(self.single_outstanding);
    }

    /// Bus outputs for this step
    pub const fn outputs(&self) -> ReadPortOut {
        ReadPortOut {
            request: self.command,
        }
    }

    /// Sample the bus at the edge.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BufferOverflow`](crate::EngineError::BufferOverflow)
    /// if a beat finds the buffer full, which the credit check rules out.
    pub fn update(
        &mut self,
        input: &ReadPortIn,
        buffer: &mut ElasticBuffer,
        stats: &mut TransferStats,
    ) -> Result<()> {
        // Data belongs to commands accepted in earlier steps.
        if input.beat.valid {
            self.receive(input.beat.value, buffer, stats)?;
        }

        if let Some(cmd) = self.command {
            if input.backpressure {
                stats.read_stall_cycles += 1;
                self.state = ReadState::WaitAccept;
            } else {
                debug!(
                    "read burst accepted: {:#010x} x{}",
                    cmd.address, cmd.burst_length_words
                );
                stats.read_commands += 1;
                self.pending.push_back(PendingBurst {
                    address: cmd.address,
                    length: cmd.burst_length_words,
                    remaining_beats: cmd.burst_length_words,
                });
                self.words_to_issue -= cmd.burst_length_words;
                self.issued_bytes = self
                    .issued_bytes
                    .wrapping_add(cmd.burst_length_words * 4);
                self.command = None;
            }
        }

        if self.command.is_none() {
            self.try_issue(buffer);
        }
        Ok(())
    }

    fn receive(
        &mut self,
        value: u32,
        buffer: &mut ElasticBuffer,
        stats: &mut TransferStats,
    ) -> Result<()> {
        let Some(burst) = self.pending.front_mut() else {
            warn!("read beat {value:#x} with no outstanding burst dropped");
            stats.stray_beats += 1;
            return Ok(());
        };
        trace!(
            "read beat {:#010x} = {value:#x}",
            burst
                .address
                .wrapping_add((burst.length - burst.remaining_beats) * 4)
        );
        buffer.push(value)?;
        stats.words_read += 1;
        burst.remaining_beats -= 1;
        if burst.remaining_beats == 0 {
            debug!("read burst complete: {:#010x}", burst.address);
            self.words_completed += burst.length;
            self.pending.pop_front();
        }
        Ok(())
    }

    fn owed_beats(&self) -> u32 {
        self.pending.iter().map(|b| b.remaining_beats).sum()
    }

    fn try_issue(&mut self, buffer: &ElasticBuffer) {
        if self.words_to_issue == 0 {
            self.state = if self.pending.is_empty() {
                ReadState::Idle
            } else {
                ReadState::Receive
            };
            return;
        }

        let length = self.burst_words.min(self.words_to_issue);
        let allowed = if self.single_outstanding {
            self.pending.is_empty() && buffer.free() >= length
        } else {
            buffer.free() >= self.owed_beats() + length
        };

        if allowed {
            let cmd = BusCommand::new(self.source.wrapping_add(self.issued_bytes), length);
            trace!("read request {:#010x} x{length}", cmd.address);
            self.command = Some(cmd);
            self.state = ReadState::Request;
        } else if self.pending.is_empty() {
            self.state = ReadState::Idle;
        } else {
            self.state = ReadState::Receive;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::DataBeat;

    fn accept() -> ReadPortIn {
        ReadPortIn::default()
    }

    fn stall() -> ReadPortIn {
        ReadPortIn {
            backpressure: true,
            beat: DataBeat::IDLE,
        }
    }

    fn beat(v: u32) -> ReadPortIn {
        ReadPortIn {
            backpressure: true,
            beat: DataBeat::valid(v),
        }
    }

    #[test]
    fn request_held_until_accepted() {
        let mut buf = ElasticBuffer::new(16);
        let mut stats = TransferStats::default();
        let mut rm = ReadMaster::new(false);
        rm.start(0x1000, 4, 8, &buf);
        let first = rm.outputs().request;
        assert_eq!(first, Some(BusCommand::new(0x1000, 4)));

        rm.update(&stall(), &mut buf, &mut stats).unwrap();
        assert_eq!(rm.state(), ReadState::WaitAccept);
        assert_eq!(rm.outputs().request, first);
        assert_eq!(stats.read_stall_cycles, 1);

        rm.update(&accept(), &mut buf, &mut stats).unwrap();
        assert_eq!(rm.outputs().request, Some(BusCommand::new(0x1010, 4)));
        assert_eq!(rm.outstanding_bursts(), 1);
    }

    #[test]
    fn pipelined_respects_buffer_credit() {
        let mut buf = ElasticBuffer::new(8);
        let mut stats = TransferStats::default();
        let mut rm = ReadMaster::new(false);
        rm.start(0, 4, 16, &buf);
        rm.update(&accept(), &mut buf, &mut stats).unwrap();
        rm.update(&accept(), &mut buf, &mut stats).unwrap();
        // 8 beats owed, buffer holds 8: no third request
        assert_eq!(rm.outstanding_bursts(), 2);
        assert_eq!(rm.outputs().request, None);
        assert_eq!(rm.state(), ReadState::Receive);
    }

    #[test]
    fn single_outstanding_waits_for_data_phase() {
        let mut buf = ElasticBuffer::new(16);
        let mut stats = TransferStats::default();
        let mut rm = ReadMaster::new(true);
        rm.start(0, 2, 4, &buf);
        rm.update(&accept(), &mut buf, &mut stats).unwrap();
        assert_eq!(rm.outputs().request, None);
        rm.update(&beat(7), &mut buf, &mut stats).unwrap();
        assert_eq!(rm.outputs().request, None);
        rm.update(&beat(8), &mut buf, &mut stats).unwrap();
        assert_eq!(rm.outputs().request, Some(BusCommand::new(8, 2)));
        assert_eq!(rm.words_completed(), 2);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn progress_advances_per_burst() {
        let mut buf = ElasticBuffer::new(16);
        let mut stats = TransferStats::default();
        let mut rm = ReadMaster::new(false);
        rm.start(0, 2, 2, &buf);
        rm.update(&accept(), &mut buf, &mut stats).unwrap();
        rm.update(&beat(1), &mut buf, &mut stats).unwrap();
        assert_eq!(rm.words_completed(), 0);
        rm.update(&beat(2), &mut buf, &mut stats).unwrap();
        assert_eq!(rm.words_completed(), 2);
        assert!(rm.is_finished());
        assert_eq!(rm.state(), ReadState::Idle);
    }

    #[test]
    fn stray_beat_counted_and_dropped() {
        let mut buf = ElasticBuffer::new(4);
        let mut stats = TransferStats::default();
        let mut rm = ReadMaster::new(false);
        rm.update(&beat(5), &mut buf, &mut stats).unwrap();
        assert_eq!(stats.stray_beats, 1);
        assert!(buf.is_empty());
    }
}
