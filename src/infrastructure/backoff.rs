use crate::types::constants::{
    MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY_MS, RECONNECT_MAX_DELAY_MS, RECONNECT_MULTIPLIER,
};
use std::time::Duration;

/// Reconnection backoff policy.
///
/// The delay starts at the base value and grows by the multiplier after every
/// failed attempt, capped at the maximum delay. Once the attempt budget is
/// exhausted, [`next_delay`](Self::next_delay) returns `None` and the caller
/// must stop retrying until the policy is [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    delay: Duration,
    base: Duration,
    max_delay: Duration,
    max_attempts: u32,
    multiplier: f64,
}

impl Backoff {
    pub fn new(base: Duration, max_delay: Duration, max_attempts: u32, multiplier: f64) -> Self {
        Self {
            attempt: 0,
            delay: base,
            base,
            max_delay,
            max_attempts,
            multiplier,
        }
    }

    /// Next delay to wait before retrying, or `None` when the budget is spent.
    ///
    /// Consumes one attempt and advances the delay for the attempt after this
    /// one, so the first call always yields the base delay.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;

        let current = self.delay;
        let grown = (self.delay.as_millis() as f64 * self.multiplier) as u64;
        self.delay = Duration::from_millis(grown).min(self.max_delay);
        Some(current)
    }

    /// Attempts consumed since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Back to zero attempts and the base delay. Called on a successful open.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.delay = self.base;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(RECONNECT_BASE_DELAY_MS),
            Duration::from_millis(RECONNECT_MAX_DELAY_MS),
            MAX_RECONNECT_ATTEMPTS,
            RECONNECT_MULTIPLIER,
        )
    }
}
