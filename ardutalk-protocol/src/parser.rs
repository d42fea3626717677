//! Byte-at-a-time frame state machine
//!
//! ```text
//! IDLE ─HEADER─▶ LENGTH ─▶ TYPE ─▶ PAYLOAD ─▶ CRC_HI ─▶ CRC_LO ─▶ FOOTER ─▶ IDLE
//! ```
//!
//! Every terminal outcome, good or bad, returns to IDLE. Failures trigger a
//! look-back through the [`ResyncBuffer`] whose result is reported with the
//! rejection; the parser itself always restarts clean.
//!
//! # Header restart
//!
//! A HEADER byte seen in TYPE, at the first PAYLOAD byte, in CRC_HI or in
//! CRC_LO is taken as the start of a new frame and moves the parser back to
//! LENGTH. It is not honoured mid-payload (0xAA is ordinary data there) or
//! in FOOTER. This mirrors the deployed peer's receiver so both ends
//! recover from the same corruptions.

use heapless::Vec;

use crate::crc::crc16;
use crate::frame::{
    is_valid_length, Frame, FrameError, ReceivedFrame, FRAME_FOOTER, FRAME_HEADER,
    MAX_FRAME_LENGTH,
};
use crate::resync::{ResyncBuffer, DEFAULT_RESYNC_CAPACITY};

/// Capacity of the TYPE + PAYLOAD receive buffer
pub const BODY_CAPACITY: usize = MAX_FRAME_LENGTH as usize;

/// Parser states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseState {
    /// Waiting for HEADER byte
    Idle,
    /// Got HEADER, waiting for LENGTH
    Length,
    /// Got LENGTH, waiting for TYPE
    Type,
    /// Reading payload bytes
    Payload,
    /// Waiting for CRC high byte
    CrcHigh,
    /// Waiting for CRC low byte
    CrcLow,
    /// CRC matched, waiting for FOOTER
    Footer,
}

/// Result of the look-back after a failed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resync {
    /// A HEADER + plausible LENGTH pair sits in the history window
    Found {
        /// Window position of the candidate HEADER (0 = oldest byte)
        position: usize,
    },
    /// Nothing plausible; wait for the next HEADER on the wire
    NotFound,
}

/// A discarded frame attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rejection {
    /// Why the frame was discarded
    pub error: FrameError,
    /// Outcome of the history search
    pub resync: Resync,
}

/// State machine for parsing incoming frames
///
/// `N` is the resync history capacity.
#[derive(Debug)]
pub struct FrameParser<const N: usize = DEFAULT_RESYNC_CAPACITY> {
    state: ParseState,
    history: ResyncBuffer<N>,
    /// TYPE followed by PAYLOAD, exactly the CRC input
    body: Vec<u8, BODY_CAPACITY>,
    declared_length: u8,
    remaining: u8,
    crc_high: u8,
    received_crc: u16,
    computed_crc: u16,
    /// History sequence number of the HEADER that opened this attempt
    frame_start: usize,
    last_transition_ms: u64,
}

impl<const N: usize> Default for FrameParser<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameParser<N> {
    /// Create a new frame parser
    pub fn new() -> Self {
        Self {
            state: ParseState::Idle,
            history: ResyncBuffer::new(),
            body: Vec::new(),
            declared_length: 0,
            remaining: 0,
            crc_high: 0,
            received_crc: 0,
            computed_crc: 0,
            frame_start: 0,
            last_transition_ms: 0,
        }
    }

    /// Reset the parser state
    ///
    /// The byte history is kept; it describes the stream, not the frame.
    pub fn reset(&mut self) {
        self.state = ParseState::Idle;
        self.body.clear();
        self.declared_length = 0;
        self.remaining = 0;
        self.crc_high = 0;
        self.received_crc = 0;
        self.computed_crc = 0;
    }

    /// Current state
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Returns true when waiting for a HEADER
    pub fn is_idle(&self) -> bool {
        self.state == ParseState::Idle
    }

    /// Time of the last state change
    pub fn last_transition_ms(&self) -> u64 {
        self.last_transition_ms
    }

    /// Raw byte history
    pub fn history(&self) -> &ResyncBuffer<N> {
        &self.history
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is parsed,
    /// `Ok(None)` when more bytes are needed, or `Err` when the frame in
    /// progress was discarded. The parser is ready for the next byte in
    /// every case.
    pub fn feed(&mut self, byte: u8, now_ms: u64) -> Result<Option<ReceivedFrame>, Rejection> {
        let previous = self.state;
        self.history.push(byte);

        let result = self.step(byte);

        if self.state != previous {
            self.last_transition_ms = now_ms;
        }
        result
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete frame or the first rejection.
    /// Remaining bytes after either are not consumed.
    pub fn feed_bytes(
        &mut self,
        bytes: &[u8],
        now_ms: u64,
    ) -> Result<Option<ReceivedFrame>, Rejection> {
        for &byte in bytes {
            if let Some(frame) = self.feed(byte, now_ms)? {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    /// Abandon a frame that has been in progress for too long
    ///
    /// Returns true if the parser was reset. An idle parser never times out.
    pub fn check_timeout(&mut self, now_ms: u64, timeout_ms: u64) -> bool {
        if self.state == ParseState::Idle {
            return false;
        }
        if now_ms.saturating_sub(self.last_transition_ms) <= timeout_ms {
            return false;
        }
        self.reset();
        self.last_transition_ms = now_ms;
        true
    }

    fn step(&mut self, byte: u8) -> Result<Option<ReceivedFrame>, Rejection> {
        match self.state {
            ParseState::Idle => {
                if byte == FRAME_HEADER {
                    self.start_frame();
                }
                // Silently ignore non-HEADER bytes while waiting
                Ok(None)
            }
            ParseState::Length => {
                if !is_valid_length(byte) {
                    return Err(self.reject(FrameError::InvalidLength(byte)));
                }
                self.declared_length = byte;
                self.remaining = byte;
                self.body.clear();
                self.state = ParseState::Type;
                Ok(None)
            }
            ParseState::Type => {
                if byte == FRAME_HEADER {
                    self.start_frame();
                    return Ok(None);
                }
                self.push_body(byte)?;
                self.state = if self.remaining == 0 {
                    ParseState::CrcHigh
                } else {
                    ParseState::Payload
                };
                Ok(None)
            }
            ParseState::Payload => {
                // Only the TYPE byte is buffered so far
                if byte == FRAME_HEADER && self.body.len() == 1 {
                    self.start_frame();
                    return Ok(None);
                }
                self.push_body(byte)?;
                if self.remaining == 0 {
                    self.state = ParseState::CrcHigh;
                }
                Ok(None)
            }
            ParseState::CrcHigh => {
                if byte == FRAME_HEADER {
                    self.start_frame();
                    return Ok(None);
                }
                self.crc_high = byte;
                self.state = ParseState::CrcLow;
                Ok(None)
            }
            ParseState::CrcLow => {
                if byte == FRAME_HEADER {
                    self.start_frame();
                    return Ok(None);
                }
                self.received_crc = u16::from_be_bytes([self.crc_high, byte]);
                self.computed_crc = crc16(&self.body);
                if self.received_crc != self.computed_crc {
                    return Err(self.reject(FrameError::CrcMismatch {
                        received: self.received_crc,
                        computed: self.computed_crc,
                    }));
                }
                self.state = ParseState::Footer;
                Ok(None)
            }
            ParseState::Footer => {
                if byte != FRAME_FOOTER {
                    return Err(self.reject(FrameError::BadFooter(byte)));
                }
                debug_assert_eq!(self.body.len(), usize::from(self.declared_length));
                let frame = Frame::new(self.body[0], &self.body[1..])
                    .map(|frame| ReceivedFrame {
                        frame,
                        crc: self.received_crc,
                    })
                    .map_err(|_| self.reject(FrameError::BufferOverflow));
                self.reset();
                frame.map(Some)
            }
        }
    }

    /// Begin a frame attempt at the byte just pushed
    fn start_frame(&mut self) {
        self.frame_start = self.history.last_sequence();
        self.state = ParseState::Length;
    }

    /// Append a TYPE or PAYLOAD byte
    fn push_body(&mut self, byte: u8) -> Result<(), Rejection> {
        if self.remaining == 0 || self.body.push(byte).is_err() {
            return Err(self.reject(FrameError::BufferOverflow));
        }
        self.remaining -= 1;
        Ok(())
    }

    /// Discard the frame in progress after looking back for a new start
    fn reject(&mut self, error: FrameError) -> Rejection {
        // Search from one past the HEADER that opened this attempt; if that
        // HEADER has already left the window, search the whole window.
        let from = self
            .history
            .position_of(self.frame_start)
            .map_or(0, |pos| pos + 1);
        let resync = match self.history.find_frame_start(from) {
            Some(position) => Resync::Found { position },
            None => Resync::NotFound,
        };
        self.reset();
        Rejection { error, resync }
    }
}
