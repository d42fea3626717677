//! Diagnostic events and link statistics
//!
//! Every failure on the receive path is handled locally by returning the
//! parser to IDLE. These types make those failures observable without
//! changing control flow.

use ardutalk_protocol::{FrameError, ParseState, PayloadError, Rejection, Resync};

/// Something noteworthy that happened on the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// A frame passed CRC and footer checks
    FrameAccepted {
        /// Raw TYPE byte
        frame_type: u8,
        /// LENGTH field
        length: u8,
    },
    /// A frame attempt was discarded, with the result of the history search
    FrameRejected(Rejection),
    /// A frame in progress went stale and was abandoned
    StaleFrameTimeout {
        /// State the parser was stuck in
        state: ParseState,
    },
    /// The frame was valid but its payload could not be delivered
    PayloadRejected(PayloadError),
    /// A received frame was echoed back
    EchoSent {
        /// Bytes written
        len: usize,
    },
    /// Writing an echo failed
    EchoWriteFailed,
}

impl LinkEvent {
    /// Returns true for events that indicate lost or unusable data
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            LinkEvent::FrameRejected(_)
                | LinkEvent::StaleFrameTimeout { .. }
                | LinkEvent::PayloadRejected(_)
                | LinkEvent::EchoWriteFailed
        )
    }
}

/// Link counters
///
/// All counters saturate rather than wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Raw bytes taken from the source
    pub bytes_received: u32,
    /// Frames that passed CRC and footer checks
    pub frames_received: u32,
    /// Frames delivered to a registered handler
    pub frames_dispatched: u32,
    /// Frames written by the send API
    pub frames_sent: u32,
    /// LENGTH byte out of range
    pub invalid_length: u32,
    /// Frame body did not fit
    pub buffer_overflow: u32,
    /// CRC mismatch
    pub crc_mismatch: u32,
    /// Wrong byte where the footer was expected
    pub bad_footer: u32,
    /// Frames abandoned by the stale frame timeout
    pub timeouts: u32,
    /// Valid frames with an unusable payload
    pub payload_rejected: u32,
    /// Rejections where the history held a plausible frame start
    pub resync_found: u32,
    /// Echoes written
    pub echoes_sent: u32,
    /// Failed echo writes
    pub write_failures: u32,
}

fn bump(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}

impl LinkStats {
    /// All counters at zero
    pub const fn new() -> Self {
        Self {
            bytes_received: 0,
            frames_received: 0,
            frames_dispatched: 0,
            frames_sent: 0,
            invalid_length: 0,
            buffer_overflow: 0,
            crc_mismatch: 0,
            bad_footer: 0,
            timeouts: 0,
            payload_rejected: 0,
            resync_found: 0,
            echoes_sent: 0,
            write_failures: 0,
        }
    }

    /// Zero every counter
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Update the counters for an event
    pub fn record(&mut self, event: &LinkEvent) {
        match event {
            LinkEvent::FrameAccepted { .. } => bump(&mut self.frames_received),
            LinkEvent::FrameRejected(rejection) => {
                match rejection.error {
                    FrameError::InvalidLength(_) => bump(&mut self.invalid_length),
                    FrameError::CrcMismatch { .. } => bump(&mut self.crc_mismatch),
                    FrameError::BadFooter(_) => bump(&mut self.bad_footer),
                    FrameError::BufferOverflow
                    | FrameError::PayloadTooLarge
                    | FrameError::BufferTooSmall => bump(&mut self.buffer_overflow),
                }
                if let Resync::Found { .. } = rejection.resync {
                    bump(&mut self.resync_found);
                }
            }
            LinkEvent::StaleFrameTimeout { .. } => bump(&mut self.timeouts),
            LinkEvent::PayloadRejected(_) => bump(&mut self.payload_rejected),
            LinkEvent::EchoSent { .. } => bump(&mut self.echoes_sent),
            LinkEvent::EchoWriteFailed => bump(&mut self.write_failures),
        }
    }

    pub(crate) fn record_byte(&mut self) {
        bump(&mut self.bytes_received);
    }

    pub(crate) fn record_dispatch(&mut self) {
        bump(&mut self.frames_dispatched);
    }

    pub(crate) fn record_send(&mut self) {
        bump(&mut self.frames_sent);
    }

    /// Frame attempts discarded by the parser
    pub fn frames_rejected(&self) -> u32 {
        self.invalid_length
            .saturating_add(self.buffer_overflow)
            .saturating_add(self.crc_mismatch)
            .saturating_add(self.bad_footer)
    }
}
