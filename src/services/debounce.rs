//! Signal debouncing - minimum-dwell filtering of digital sensor reads
//!
//! Reed switches and tamper contacts bounce on transition. A candidate
//! change is accepted only if the signal has been stable for longer than
//! the debounce window since the last accepted change.

use std::time::{Duration, Instant};

/// Minimum dwell before a transition is accepted
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(50);

/// Debounced latch for one physical signal (door contact, tamper contact)
#[derive(Debug, Clone)]
pub struct DebouncedSignal {
    current: bool,
    last_change: Option<Instant>,
    window: Duration,
}

impl DebouncedSignal {
    pub fn new(initial: bool) -> Self {
        Self::with_window(initial, DEBOUNCE_WINDOW)
    }

    pub fn with_window(initial: bool, window: Duration) -> Self {
        Self { current: initial, last_change: None, window }
    }

    /// Feed one raw reading, returning the (possibly unchanged) stable value.
    ///
    /// A differing reading flips the latch only if more than the window
    /// has elapsed since the last accepted change. The very first change
    /// after construction is always accepted.
    pub fn poll(&mut self, raw: bool, now: Instant) -> bool {
        if raw != self.current {
            let accept = match self.last_change {
                Some(at) => now.duration_since(at) > self.window,
                None => true,
            };
            if accept {
                self.current = raw;
                self.last_change = Some(now);
            }
        }
        self.current
    }

    /// Current stable value without feeding a reading
    pub fn value(&self) -> bool {
        self.current
    }
}
