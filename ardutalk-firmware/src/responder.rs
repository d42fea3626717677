//! Answers to REQUEST frames
//!
//! The host asks for a kind by TYPE byte; the board replies with a value of
//! that kind built from what it knows about itself.

use ardutalk_core::{Link, SendError};
use ardutalk_hal::{ByteSink, ByteSource, Clock};
use ardutalk_protocol::{FrameType, Orientation};
use defmt::*;
use serde_json::json;

/// Board name sent in STRING replies
pub const BOARD_NAME: &str = "ardutalk-rp2040";

/// Send a reply for a request of TYPE `requested`
///
/// `orientation` is the last attitude received from the host; the board
/// has no IMU of its own.
pub fn respond<R, W, C, const N: usize>(
    link: &mut Link<R, W, C, N>,
    requested: u8,
    orientation: Orientation,
) -> Result<(), SendError<W::Error>>
where
    R: ByteSource,
    W: ByteSink,
    C: Clock,
{
    let uptime_ms = link.clock().now_ms();

    match FrameType::from_byte(requested) {
        Some(FrameType::Int) => {
            // Uptime in seconds, clamped to the INT range
            let seconds = (uptime_ms / 1000).min(i16::MAX as u64) as i16;
            link.send_int(seconds)
        }
        Some(FrameType::Float) => link.send_float(uptime_ms as f32 / 1000.0),
        Some(FrameType::String) => link.send_string(BOARD_NAME),
        Some(FrameType::Json) => {
            let stats = *link.stats();
            link.send_json(&json!({
                "board": BOARD_NAME,
                "uptime_ms": uptime_ms,
                "frames_received": stats.frames_received,
                "frames_rejected": stats.frames_rejected(),
                "timeouts": stats.timeouts,
            }))
        }
        Some(FrameType::Orientation) => link.send_orientation(orientation),
        Some(FrameType::Request) | None => {
            warn!("No reply for requested type {=u8:#x}", requested);
            Ok(())
        }
    }
}
