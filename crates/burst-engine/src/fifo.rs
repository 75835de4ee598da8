//! Elastic buffer between the read and write sides.
//!
//! Bounded FIFO of raw words. The producer checks [`free`](ElasticBuffer::free)
//! before committing to a burst; a push into a full buffer is reported, never
//! dropped.

use std::collections::VecDeque;

use crate::error::{EngineError, Result};

/// Bounded, order-preserving word FIFO
#[derive(Debug, Clone)]
pub struct ElasticBuffer {
    words: VecDeque<u32>,
    depth: u32,
    peak: u32,
}

impl ElasticBuffer {
    /// Create an empty buffer holding at most `depth` words
    pub fn new(depth: u32) -> Self {
        Self {
            words: VecDeque::with_capacity(depth as usize),
            depth,
            peak: 0,
        }
    }

    /// Append a word
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::BufferOverflow`] if the buffer is full; the
    /// word is not stored.
    pub fn push(&mut self, word: u32) -> Result<()> {
        if self.is_full() {
            return Err(EngineError::BufferOverflow { depth: self.depth });
        }
        self.words.push_back(word);
        self.peak = self.peak.max(self.len());
        Ok(())
    }

    /// Remove the oldest word
    pub fn pop(&mut self) -> Option<u32> {
        self.words.pop_front()
    }

    /// Oldest word without removing it
    pub fn front(&self) -> Option<u32> {
        self.words.front().copied()
    }

    /// Words stored
    #[allow(clippy::cast_possible_truncation)]
    pub fn len(&self) -> u32 {
        // bounded by depth, which is a u32
        self.words.len() as u32
    }

    /// Free slots
    pub fn free(&self) -> u32 {
        self.depth - self.len()
    }

    /// Capacity in words
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Buffer holds no word
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Buffer holds `depth` words
    pub fn is_full(&self) -> bool {
        self.len() >= self.depth
    }

    /// Highest occupancy since the last [`clear`](Self::clear)
    pub const fn peak_occupancy(&self) -> u32 {
        self.peak
    }

    /// Drop all words and reset the occupancy high-water mark
    pub fn clear(&mut self) {
        self.words.clear();
        self.peak = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let mut buf = ElasticBuffer::new(4);
        for w in [10, 20, 30] {
            buf.push(w).unwrap();
        }
        assert_eq!(buf.front(), Some(10));
        assert_eq!(buf.pop(), Some(10));
        buf.push(40).unwrap();
        let drained: Vec<_> = std::iter::from_fn(|| buf.pop()).collect();
        assert_eq!(drained, vec![20, 30, 40]);
        assert!(buf.is_empty());
        assert_eq!(buf.pop(), None);
    }

    #[test]
    fn full_buffer_rejects_push() {
        let mut buf = ElasticBuffer::new(2);
        buf.push(1).unwrap();
        buf.push(2).unwrap();
        assert!(buf.is_full());
        assert_eq!(buf.free(), 0);
        assert_eq!(buf.push(3), Err(EngineError::BufferOverflow { depth: 2 }));
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.pop(), Some(1));
    }

    #[test]
    fn peak_tracks_high_water_mark() {
        let mut buf = ElasticBuffer::new(8);
        for w in 0..5 {
            buf.push(w).unwrap();
        }
        for _ in 0..4 {
            buf.pop();
        }
        buf.push(9).unwrap();
        assert_eq!(buf.peak_occupancy(), 5);
        buf.clear();
        assert_eq!(buf.peak_occupancy(), 0);
        assert_eq!(buf.free(), 8);
    }
}
