use crate::types::constants::{MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY};
use std::time::Duration;

/// Reconnect budget with linear backoff.
///
/// Attempt `k` waits `base_delay * k`. Once `max_attempts` attempts have been
/// handed out, [`next_delay`](Self::next_delay) returns `None` until reset.
#[derive(Debug, Clone)]
pub struct Timer {
    attempts: u32,
    base_delay: Duration,
    max_attempts: u32,
}

impl Timer {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            base_delay,
            max_attempts,
        }
    }

    /// Claims the next attempt and returns how long to wait before it
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        self.attempts += 1;
        Some(self.base_delay.saturating_mul(self.attempts))
    }

    /// Number of attempts handed out since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Reset the timer
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(Duration::from_millis(RECONNECT_DELAY), MAX_RECONNECT_ATTEMPTS)
    }
}
