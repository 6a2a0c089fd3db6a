//! Manually advanced clock and recording delay.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::traits::{Clock, DelayUs};

/// Clock that only moves when [`advance`](MockClock::advance) is called.
///
/// # Examples
///
/// ```
/// use seatlink_hardware::mock::MockClock;
/// use seatlink_hardware::traits::Clock;
///
/// let clock = MockClock::new();
/// let session_clock = clock.clone();
///
/// clock.advance(1_000);
/// assert_eq!(session_clock.now_ms(), 1_000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now: Arc<AtomicU64>,
}

impl MockClock {
    /// Create a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock reading `ms`.
    pub fn starting_at(ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(ms)),
        }
    }

    /// Move the clock forward by `ms`.
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    /// Jump to an absolute reading. Panics if that would move backwards.
    pub fn set(&self, ms: u64) {
        let previous = self.now.swap(ms, Ordering::SeqCst);
        assert!(ms >= previous, "MockClock must not go backwards");
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Delay that returns immediately and remembers the total requested.
#[derive(Debug, Clone, Default)]
pub struct MockDelay {
    total_us: Arc<AtomicU64>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of every delay requested so far, in microseconds.
    pub fn total_us(&self) -> u64 {
        self.total_us.load(Ordering::SeqCst)
    }
}

impl DelayUs for MockDelay {
    fn delay_us(&mut self, us: u32) {
        self.total_us.fetch_add(u64::from(us), Ordering::SeqCst);
    }
}
