//! History of recently received raw bytes
//!
//! After a broken frame the parser looks back through this window for a
//! HEADER followed by a plausible LENGTH. The search only reports whether
//! such a candidate exists; bytes are never replayed into the parser.

use heapless::HistoryBuffer;

use crate::frame::{is_valid_length, FRAME_HEADER};

/// Default number of raw bytes remembered
pub const DEFAULT_RESYNC_CAPACITY: usize = 32;

/// Ring of the last `N` raw bytes, oldest overwritten first
#[derive(Debug)]
pub struct ResyncBuffer<const N: usize = DEFAULT_RESYNC_CAPACITY> {
    history: HistoryBuffer<u8, N>,
    /// Total bytes ever pushed (wrapping); the sequence number of the next byte
    written: usize,
}

impl<const N: usize> Default for ResyncBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ResyncBuffer<N> {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self {
            history: HistoryBuffer::new(),
            written: 0,
        }
    }

    /// Record a received byte
    pub fn push(&mut self, byte: u8) {
        self.history.write(byte);
        self.written = self.written.wrapping_add(1);
    }

    /// Number of valid entries (saturates at capacity)
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Check if no byte has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.history.len() == 0
    }

    /// Ring capacity
    pub fn capacity(&self) -> usize {
        N
    }

    /// Sequence number the next pushed byte will get
    pub fn written(&self) -> usize {
        self.written
    }

    /// Sequence number of the most recently pushed byte
    pub fn last_sequence(&self) -> usize {
        self.written.wrapping_sub(1)
    }

    /// Window position (0 = oldest) of the byte with sequence number `seq`
    ///
    /// Returns `None` once the byte has been overwritten.
    pub fn position_of(&self, seq: usize) -> Option<usize> {
        let age = self.written.wrapping_sub(seq);
        if age == 0 || age > self.len() {
            return None;
        }
        Some(self.len() - age)
    }

    /// Iterate over the window, oldest first
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.history.oldest_ordered().copied()
    }

    /// Find a plausible frame start at or after window position `from`
    ///
    /// A candidate is a HEADER byte immediately followed, inside the window,
    /// by a byte in the valid LENGTH range. Returns the window position of
    /// the HEADER.
    pub fn find_frame_start(&self, from: usize) -> Option<usize> {
        let mut header_at = None;
        for (i, byte) in self.iter().enumerate().skip(from) {
            if let Some(at) = header_at {
                if is_valid_length(byte) {
                    return Some(at);
                }
            }
            header_at = (byte == FRAME_HEADER).then_some(i);
        }
        None
    }
}
