//! In-memory byte pipe
//!
//! A bounded FIFO that is both a [`ByteSource`] and a [`ByteSink`]. Bytes
//! written to it are read back in order. Useful for host testing and for
//! wiring two links together without hardware.

use heapless::Deque;

use crate::serial::{ByteSink, ByteSource};

/// Loopback errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoopbackError {
    /// Read attempted with no pending bytes
    Empty,
    /// Write did not fit; nothing was written
    Full,
}

/// Bounded in-memory byte pipe with capacity `N`
#[derive(Debug, Default)]
pub struct Loopback<const N: usize> {
    queue: Deque<u8, N>,
}

impl<const N: usize> Loopback<N> {
    /// Create an empty pipe
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
        }
    }

    /// Queue bytes for reading
    ///
    /// Either all of `data` is queued or none of it.
    pub fn inject(&mut self, data: &[u8]) -> Result<(), LoopbackError> {
        if self.queue.capacity() - self.queue.len() < data.len() {
            return Err(LoopbackError::Full);
        }
        for &byte in data {
            // Capacity checked above
            let _ = self.queue.push_back(byte);
        }
        Ok(())
    }

    /// Remove and return everything pending, oldest first
    pub fn drain(&mut self) -> heapless::Vec<u8, N> {
        let mut out = heapless::Vec::new();
        while let Some(byte) = self.queue.pop_front() {
            // Same capacity as the queue
            let _ = out.push(byte);
        }
        out
    }

    /// Number of pending bytes
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Discard everything pending
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

impl<const N: usize> ByteSource for Loopback<N> {
    type Error = LoopbackError;

    fn bytes_available(&mut self) -> Result<usize, Self::Error> {
        Ok(self.queue.len())
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        self.queue.pop_front().ok_or(LoopbackError::Empty)
    }
}

impl<const N: usize> ByteSink for Loopback<N> {
    type Error = LoopbackError;

    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.inject(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
