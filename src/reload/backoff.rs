use std::time::{Duration, Instant};

/// Exponential backoff with a ceiling, reset on success (`spec.md` §4.4
/// `SetBackoff`).
pub struct Backoff {
    base: Duration,
    max: Duration,
    consecutive_failures: u32,
    last_attempt: Option<Instant>,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            consecutive_failures: 0,
            last_attempt: None,
        }
    }

    pub fn set(&mut self, base: Duration, max: Duration) {
        self.base = base;
        self.max = max;
    }

    fn current_interval(&self) -> Duration {
        if self.consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(self.consecutive_failures - 1).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn remaining(&self) -> Duration {
        match self.last_attempt {
            None => Duration::ZERO,
            Some(at) => self.current_interval().saturating_sub(at.elapsed()),
        }
    }

    pub fn ready(&self) -> bool {
        self.remaining() == Duration::ZERO
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_attempt = Some(Instant::now());
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.last_attempt = None;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_until_a_failure_is_recorded() {
        let backoff = Backoff::default();
        assert!(backoff.ready());
    }

    #[test]
    fn failure_blocks_until_interval_elapses() {
        let mut backoff = Backoff::new(Duration::from_millis(50), Duration::from_secs(1));
        backoff.record_failure();
        assert!(!backoff.ready());
        std::thread::sleep(Duration::from_millis(60));
        assert!(backoff.ready());
    }

    #[test]
    fn success_resets_failure_count() {
        let mut backoff = Backoff::new(Duration::from_secs(10), Duration::from_secs(60));
        backoff.record_failure();
        backoff.record_success();
        assert!(backoff.ready());
    }

    #[test]
    fn interval_grows_exponentially_and_caps_at_max() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(4));
        backoff.record_failure();
        assert_eq!(backoff.current_interval(), Duration::from_secs(1));
        backoff.record_failure();
        assert_eq!(backoff.current_interval(), Duration::from_secs(2));
        backoff.record_failure();
        assert_eq!(backoff.current_interval(), Duration::from_secs(4));
        backoff.record_failure();
        assert_eq!(backoff.current_interval(), Duration::from_secs(4));
    }
}
