//! Link time base backed by the embassy time driver

use ardutalk_hal::Clock;
use embassy_time::Instant;

/// Milliseconds since boot
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }
}
