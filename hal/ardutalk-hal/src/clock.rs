//! Monotonic time base
//!
//! The link only needs millisecond resolution to detect stalled frames.

use core::cell::Cell;

/// Monotonic millisecond clock
pub trait Clock {
    /// Milliseconds since an arbitrary fixed epoch; never goes backwards
    fn now_ms(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        C::now_ms(self)
    }
}

/// Clock driven by hand
///
/// Used on the host, where tests decide when time passes.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<u64>,
}

impl ManualClock {
    /// Create a clock reading `start_ms`
    pub const fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Cell::new(start_ms),
        }
    }

    /// Set the current time
    pub fn set(&self, now_ms: u64) {
        self.now_ms.set(now_ms);
    }

    /// Move time forward by `delta_ms`
    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.set(self.now_ms.get().saturating_add(delta_ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(100);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 350);

        clock.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn test_clock_by_reference() {
        fn read(clock: impl Clock) -> u64 {
            clock.now_ms()
        }

        let clock = ManualClock::new(42);
        assert_eq!(read(&clock), 42);
    }
}
