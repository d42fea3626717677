//! Frame encoding for the ArduTalk wire format.
//!
//! Frame format:
//! - HEADER (1 byte): 0xAA synchronization byte
//! - LENGTH (1 byte): 1 (for TYPE) + payload length
//! - TYPE (1 byte): payload kind
//! - PAYLOAD (0-253 bytes): kind-specific data
//! - CRC (2 bytes): CRC16 of TYPE and PAYLOAD, high byte first
//! - FOOTER (1 byte): 0x55 end marker

use heapless::Vec;

use crate::crc::{crc16_update, CRC16_INIT};

/// Frame synchronization byte
pub const FRAME_HEADER: u8 = 0xAA;

/// Frame end marker
pub const FRAME_FOOTER: u8 = 0x55;

/// Smallest LENGTH accepted by the receiver (TYPE plus one payload byte)
pub const MIN_FRAME_LENGTH: u8 = 2;

/// Largest LENGTH accepted by the receiver
pub const MAX_FRAME_LENGTH: u8 = 200;

/// Maximum payload size the encoder can express in the LENGTH byte
///
/// Peers only accept payloads up to `MAX_FRAME_LENGTH - 1` bytes.
pub const MAX_PAYLOAD_SIZE: usize = 253;

/// Bytes around the payload: HEADER, LENGTH, TYPE, CRC (2), FOOTER
pub const FRAME_OVERHEAD: usize = 6;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD_SIZE + FRAME_OVERHEAD;

/// Check whether a LENGTH byte is acceptable to the receiver
pub fn is_valid_length(length: u8) -> bool {
    (MIN_FRAME_LENGTH..=MAX_FRAME_LENGTH).contains(&length)
}

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// LENGTH byte outside the accepted range
    InvalidLength(u8),
    /// Frame body would not fit the receive buffer
    BufferOverflow,
    /// CRC carried by the frame does not match its contents
    CrcMismatch { received: u16, computed: u16 },
    /// Byte after the CRC was not the footer
    BadFooter(u8),
}

/// Payload kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameType {
    /// Signed 16-bit integer
    Int,
    /// 32-bit float
    Float,
    /// Raw text
    String,
    /// Serialized JSON document
    Json,
    /// Ask the peer to send a given kind
    Request,
    /// Yaw, roll and pitch in fixed point
    Orientation,
}

// Wire format values
const TYPE_INT: u8 = 0x01;
const TYPE_FLOAT: u8 = 0x02;
const TYPE_STRING: u8 = 0x03;
const TYPE_JSON: u8 = 0x04;
const TYPE_REQUEST: u8 = 0x05;
const TYPE_ORIENTATION: u8 = 0x06;

impl FrameType {
    /// Parse a kind from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            TYPE_INT => Some(FrameType::Int),
            TYPE_FLOAT => Some(FrameType::Float),
            TYPE_STRING => Some(FrameType::String),
            TYPE_JSON => Some(FrameType::Json),
            TYPE_REQUEST => Some(FrameType::Request),
            TYPE_ORIENTATION => Some(FrameType::Orientation),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            FrameType::Int => TYPE_INT,
            FrameType::Float => TYPE_FLOAT,
            FrameType::String => TYPE_STRING,
            FrameType::Json => TYPE_JSON,
            FrameType::Request => TYPE_REQUEST,
            FrameType::Orientation => TYPE_ORIENTATION,
        }
    }

    /// Payload size for fixed-size kinds, `None` for variable-size kinds
    pub fn fixed_payload_len(self) -> Option<usize> {
        match self {
            FrameType::Int => Some(2),
            FrameType::Float => Some(4),
            FrameType::Request => Some(1),
            FrameType::Orientation => Some(6),
            FrameType::String | FrameType::Json => None,
        }
    }

    /// Returns true if a received frame of this kind is echoed back
    ///
    /// Requests are never echoed; the peer would read the echo as a new
    /// request and answer it again.
    pub fn is_echoed(self) -> bool {
        !matches!(self, FrameType::Request)
    }
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw TYPE byte (may be a kind this crate does not know)
    pub frame_type: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a new frame with the given TYPE byte and payload
    pub fn new(frame_type: u8, payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge);
        }

        let mut payload_vec = Vec::new();
        payload_vec
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;

        Ok(Self {
            frame_type,
            payload: payload_vec,
        })
    }

    /// Create a frame of a known kind
    pub fn typed(kind: FrameType, payload: &[u8]) -> Result<Self, FrameError> {
        Self::new(kind.to_byte(), payload)
    }

    /// The payload kind, if the TYPE byte is a known one
    pub fn kind(&self) -> Option<FrameType> {
        FrameType::from_byte(self.frame_type)
    }

    /// LENGTH field value: TYPE plus payload
    pub fn length(&self) -> u8 {
        // payload.len() <= MAX_PAYLOAD_SIZE, so this fits in a byte
        (1 + self.payload.len()) as u8
    }

    /// CRC16 over TYPE and PAYLOAD
    pub fn crc(&self) -> u16 {
        let crc = crc16_update(CRC16_INIT, &[self.frame_type]);
        crc16_update(crc, &self.payload)
    }

    /// Number of bytes `encode` writes
    pub fn encoded_len(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        self.encode_with_crc(self.crc(), buffer)
    }

    /// Encode this frame with an already known CRC
    fn encode_with_crc(&self, crc: u16, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let payload_end = 3 + self.payload.len();
        let [crc_hi, crc_lo] = crc.to_be_bytes();

        buffer[0] = FRAME_HEADER;
        buffer[1] = self.length();
        buffer[2] = self.frame_type;
        buffer[3..payload_end].copy_from_slice(&self.payload);
        buffer[payload_end] = crc_hi;
        buffer[payload_end + 1] = crc_lo;
        buffer[payload_end + 2] = FRAME_FOOTER;

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// A frame that passed CRC and footer validation
///
/// Keeps the CRC that arrived on the wire so an echo reproduces the
/// incoming bytes exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    /// The decoded frame
    pub frame: Frame,
    /// CRC as received (equal to `frame.crc()` once validated)
    pub crc: u16,
}

impl ReceivedFrame {
    /// Re-encode the frame exactly as it was received
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        self.frame.encode_with_crc(self.crc, buffer)
    }

    /// Re-encode the frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| FrameError::BufferTooSmall)?;
        Ok(vec)
    }

    /// Returns true if this frame should be echoed back to the sender
    ///
    /// Unknown kinds are echoed; only requests are not.
    pub fn is_echoed(&self) -> bool {
        self.frame.kind().map_or(true, FrameType::is_echoed)
    }
}
