//! Per-transfer counters

use std::fmt;

/// Counters collected over one transfer, reset on every accepted start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Steps spent `Configured` or `Running`
    pub cycles: u64,
    /// Read commands accepted by the slave
    pub read_commands: u32,
    /// Write bursts accepted by the slave
    pub write_commands: u32,
    /// Valid read beats pushed into the elastic buffer
    pub words_read: u32,
    /// Write beats accepted by the slave
    pub words_written: u32,
    /// Steps the read request was held against back-pressure
    pub read_stall_cycles: u64,
    /// Steps a write beat was held against back-pressure
    pub write_stall_cycles: u64,
    /// Highest elastic buffer occupancy (words)
    pub peak_buffer_occupancy: u32,
    /// Highest staging buffer occupancy (words)
    pub peak_staging_occupancy: u32,
    /// Read beats that arrived with no outstanding command
    pub stray_beats: u32,
}

impl TransferStats {
    /// Bytes moved to the destination
    pub const fn bytes_written(&self) -> u64 {
        self.words_written as u64 * 4
    }

    /// Destination throughput
    #[allow(clippy::cast_precision_loss)]
    pub fn words_per_cycle(&self) -> f64 {
        if self.cycles == 0 {
            0.0
        } else {
            f64::from(self.words_written) / self.cycles as f64
        }
    }
}

impl fmt::Display for TransferStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  cycles:            {}", self.cycles)?;
        writeln!(
            f,
            "  words read/written: {} / {}",
            self.words_read, self.words_written
        )?;
        writeln!(
            f,
            "  bursts read/written: {} / {}",
            self.read_commands, self.write_commands
        )?;
        writeln!(
            f,
            "  stalls read/write: {} / {}",
            self.read_stall_cycles, self.write_stall_cycles
        )?;
        writeln!(
            f,
            "  peak occupancy:    {} (buffer) / {} (staging)",
            self.peak_buffer_occupancy, self.peak_staging_occupancy
        )?;
        if self.stray_beats > 0 {
            writeln!(f, "  stray beats:       {}", self.stray_beats)?;
        }
        write!(f, "  throughput:        {:.3} words/cycle", self.words_per_cycle())
    }
}

/// Independently observable read and write progress of the current transfer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferProgress {
    /// Words the transfer moves (effective length / 4)
    pub total_words: u32,
    /// Words whose read burst has fully completed
    pub words_read: u32,
    /// Words accepted by the destination
    pub words_written: u32,
}

impl TransferProgress {
    /// Read bursts still owed
    pub const fn read_words_remaining(&self) -> u32 {
        self.total_words - self.words_read
    }

    /// Write beats still owed
    pub const fn write_words_remaining(&self) -> u32 {
        self.total_words - self.words_written
    }

    /// Every word has been read and written
    pub const fn is_complete(&self) -> bool {
        self.words_read == self.total_words && self.words_written == self.total_words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_of_empty_stats_is_zero() {
        assert!(TransferStats::default().words_per_cycle().abs() < f64::EPSILON);
    }

    #[test]
    fn throughput_and_bytes() {
        let stats = TransferStats {
            cycles: 1024,
            words_written: 512,
            ..TransferStats::default()
        };
        assert!((stats.words_per_cycle() - 0.5).abs() < f64::EPSILON);
        assert_eq!(stats.bytes_written(), 2048);
        assert!(stats.to_string().contains("0.500 words/cycle"));
    }

    #[test]
    fn progress_completion() {
        let mut p = TransferProgress {
            total_words: 8,
            words_read: 8,
            words_written: 4,
        };
        assert!(!p.is_complete());
        assert_eq!(p.write_words_remaining(), 4);
        p.words_written = 8;
        assert!(p.is_complete());
    }
}
