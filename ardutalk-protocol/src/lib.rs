//! ArduTalk wire protocol
//!
//! This crate defines the framed serial protocol spoken between a
//! microcontroller and its host. It is `no_std`, allocation-free and knows
//! nothing about the transport.
//!
//! # Protocol Overview
//!
//! All messages use a simple binary frame format:
//! ```text
//! ┌────────┬────────┬──────┬─────────────┬────────┬────────┬────────┐
//! │ HEADER │ LENGTH │ TYPE │ PAYLOAD     │ CRC_HI │ CRC_LO │ FOOTER │
//! │ 0xAA   │ 1B     │ 1B   │ 0–253B      │ 1B     │ 1B     │ 0x55   │
//! └────────┴────────┴──────┴─────────────┴────────┴────────┴────────┘
//! ```
//!
//! LENGTH counts TYPE and PAYLOAD. The CRC16 (CCITT, init 0xFFFF) covers
//! TYPE and PAYLOAD only. Receivers accept LENGTH 2 to 200.

#![no_std]
#![deny(unsafe_code)]

pub mod crc;
pub mod frame;
pub mod parser;
pub mod payload;
pub mod resync;

pub use crc::crc16;
pub use frame::{
    Frame, FrameError, FrameType, ReceivedFrame, FRAME_FOOTER, FRAME_HEADER, MAX_FRAME_LENGTH,
    MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, MIN_FRAME_LENGTH,
};
pub use parser::{FrameParser, ParseState, Rejection, Resync};
pub use payload::{Orientation, Payload, PayloadError};
pub use resync::{ResyncBuffer, DEFAULT_RESYNC_CAPACITY};
