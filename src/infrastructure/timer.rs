use crate::types::{DEFAULT_RECONNECT_FALLBACK, RECONNECT_INTERVALS};
use std::time::Duration;

/// Backoff schedule for reconnection attempts; the last interval repeats
pub struct Timer {
    attempts: u32,
    intervals: Vec<u64>,
}

impl Timer {
    pub fn new(intervals: Vec<u64>) -> Self {
        Self {
            attempts: 0,
            intervals,
        }
    }

    /// Number of delays handed out so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Get the next delay duration
    pub fn next_delay(&mut self) -> Duration {
        let delay = self
            .intervals
            .get(self.attempts as usize)
            .or_else(|| self.intervals.last())
            .copied()
            .unwrap_or(DEFAULT_RECONNECT_FALLBACK);

        self.attempts += 1;
        Duration::from_millis(delay)
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(RECONNECT_INTERVALS.to_vec())
    }
}
