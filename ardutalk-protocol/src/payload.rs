//! Typed payloads carried by frames
//!
//! Fixed-size kinds are big-endian on the wire:
//! - INT: i16, 2 bytes
//! - FLOAT: IEEE-754 f32, 4 bytes
//! - REQUEST: requested TYPE byte, 1 byte
//! - ORIENTATION: yaw, roll, pitch as i16 hundredths of a degree, 6 bytes
//!
//! STRING and JSON carry raw bytes with no terminator.

use crate::frame::{Frame, FrameError, FrameType};

/// Fixed-point scale for orientation angles (two decimal digits)
pub const ORIENTATION_SCALE: f32 = 100.0;

/// Typed payload decode errors
///
/// The frame itself was valid; only its contents were not usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    /// Fixed-size kind with the wrong number of bytes
    UnsupportedPayloadSize {
        kind: FrameType,
        expected: usize,
        actual: usize,
    },
    /// Structured payload that does not parse
    MalformedStructuredPayload,
    /// TYPE byte this crate does not know
    UnknownType(u8),
}

/// Three-axis attitude in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Orientation {
    pub yaw: f32,
    pub roll: f32,
    pub pitch: f32,
}

impl Orientation {
    /// Create an orientation from degrees
    pub const fn new(yaw: f32, roll: f32, pitch: f32) -> Self {
        Self { yaw, roll, pitch }
    }

    /// Encode as three big-endian i16 hundredths of a degree
    ///
    /// Each angle is scaled and truncated toward zero; values outside
    /// ±327.67° saturate at the i16 limits.
    pub fn to_wire(&self) -> [u8; 6] {
        let yaw = to_fixed(self.yaw).to_be_bytes();
        let roll = to_fixed(self.roll).to_be_bytes();
        let pitch = to_fixed(self.pitch).to_be_bytes();
        [yaw[0], yaw[1], roll[0], roll[1], pitch[0], pitch[1]]
    }

    /// Decode from the 6-byte wire form
    pub fn from_wire(bytes: &[u8; 6]) -> Self {
        Self {
            yaw: from_fixed([bytes[0], bytes[1]]),
            roll: from_fixed([bytes[2], bytes[3]]),
            pitch: from_fixed([bytes[4], bytes[5]]),
        }
    }
}

fn to_fixed(degrees: f32) -> i16 {
    // `as` truncates toward zero and saturates
    (degrees * ORIENTATION_SCALE) as i16
}

fn from_fixed(bytes: [u8; 2]) -> f32 {
    i16::from_be_bytes(bytes) as f32 / ORIENTATION_SCALE
}

/// A typed payload, borrowed from a frame or from the caller
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Payload<'a> {
    /// Signed 16-bit integer
    Int(i16),
    /// 32-bit float
    Float(f32),
    /// Raw text bytes (usually UTF-8, not checked)
    String(&'a [u8]),
    /// Serialized JSON bytes (parsed by the dispatcher)
    Json(&'a [u8]),
    /// Requested TYPE byte
    Request(u8),
    /// Yaw, roll and pitch
    Orientation(Orientation),
}

impl<'a> Payload<'a> {
    /// Text payload from a string slice
    pub fn text(text: &'a str) -> Self {
        Payload::String(text.as_bytes())
    }

    /// Request for a known kind
    pub fn request(kind: FrameType) -> Self {
        Payload::Request(kind.to_byte())
    }

    /// The payload kind
    pub fn kind(&self) -> FrameType {
        match self {
            Payload::Int(_) => FrameType::Int,
            Payload::Float(_) => FrameType::Float,
            Payload::String(_) => FrameType::String,
            Payload::Json(_) => FrameType::Json,
            Payload::Request(_) => FrameType::Request,
            Payload::Orientation(_) => FrameType::Orientation,
        }
    }

    /// Encode this payload into a frame
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        let kind = self.kind();
        match self {
            Payload::Int(value) => Frame::typed(kind, &value.to_be_bytes()),
            Payload::Float(value) => Frame::typed(kind, &value.to_be_bytes()),
            Payload::String(bytes) | Payload::Json(bytes) => Frame::typed(kind, bytes),
            Payload::Request(requested) => Frame::typed(kind, &[*requested]),
            Payload::Orientation(orientation) => Frame::typed(kind, &orientation.to_wire()),
        }
    }

    /// Decode the payload of a validated frame
    ///
    /// Fixed-size kinds must carry exactly their size; anything else is
    /// rejected without looking at the bytes.
    pub fn from_frame(frame: &'a Frame) -> Result<Self, PayloadError> {
        let kind = frame
            .kind()
            .ok_or(PayloadError::UnknownType(frame.frame_type))?;
        let bytes = &frame.payload[..];

        if let Some(expected) = kind.fixed_payload_len() {
            if bytes.len() != expected {
                return Err(PayloadError::UnsupportedPayloadSize {
                    kind,
                    expected,
                    actual: bytes.len(),
                });
            }
        }

        let payload = match kind {
            FrameType::Int => Payload::Int(i16::from_be_bytes([bytes[0], bytes[1]])),
            FrameType::Float => {
                Payload::Float(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            FrameType::String => Payload::String(bytes),
            FrameType::Json => Payload::Json(bytes),
            FrameType::Request => Payload::Request(bytes[0]),
            FrameType::Orientation => Payload::Orientation(Orientation::from_wire(&[
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5],
            ])),
        };
        Ok(payload)
    }
}
