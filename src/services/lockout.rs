//! Brute-force lockout policy
//!
//! Counts consecutive failed verifications. Reaching the threshold
//! engages a timed lockout during which every attempt is rejected
//! without consulting the registry. Any success clears the streak and
//! the lockout unconditionally.

use std::time::{Duration, Instant};

/// Consecutive failures that engage the lockout
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// How long the lockout holds
pub const LOCKOUT_DURATION: Duration = Duration::from_secs(60);

/// Lockout state machine. One instance per controller.
#[derive(Debug)]
pub struct LockoutPolicy {
    consecutive_failures: u32,
    locked_until: Option<Instant>,
    max_attempts: u32,
    duration: Duration,
}

impl LockoutPolicy {
    pub fn new() -> Self {
        Self::with_limits(MAX_FAILED_ATTEMPTS, LOCKOUT_DURATION)
    }

    pub fn with_limits(max_attempts: u32, duration: Duration) -> Self {
        Self { consecutive_failures: 0, locked_until: None, max_attempts, duration }
    }

    /// Re-evaluate the time-based transition. Call at the start of every
    /// security cycle and before every decision.
    ///
    /// Returns true if the lockout expired on this call (failure streak
    /// resets to zero).
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.locked_until {
            Some(until) if now >= until => {
                self.locked_until = None;
                self.consecutive_failures = 0;
                true
            }
            _ => false,
        }
    }

    /// Whether attempts are currently rejected by policy
    pub fn is_locked_out(&self) -> bool {
        self.locked_until.is_some()
    }

    /// Record a failed verification. Returns true if this failure
    /// engaged the lockout.
    ///
    /// Must not be called while locked out - rejected attempts do not
    /// advance the counter.
    pub fn record_failure(&mut self, now: Instant) -> bool {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.max_attempts {
            self.locked_until = Some(now + self.duration);
            return true;
        }
        false
    }

    /// Record a successful verification. Unconditionally clears the
    /// failure streak and any active lockout.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.locked_until = None;
    }

    pub fn failures(&self) -> u32 {
        self.consecutive_failures
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_engages_lockout() {
        let mut policy = LockoutPolicy::new();
        let t0 = Instant::now();

        for _ in 0..4 {
            assert!(!policy.record_failure(t0));
            assert!(!policy.is_locked_out());
        }
        // Fifth failure engages
        assert!(policy.record_failure(t0));
        assert!(policy.is_locked_out());
    }

    #[test]
    fn test_lockout_expires_after_duration() {
        let mut policy = LockoutPolicy::new();
        let t0 = Instant::now();

        for _ in 0..5 {
            policy.record_failure(t0);
        }

        // Still locked just before expiry
        assert!(!policy.tick(t0 + LOCKOUT_DURATION - Duration::from_millis(1)));
        assert!(policy.is_locked_out());

        // Expiry resets the counter too
        assert!(policy.tick(t0 + LOCKOUT_DURATION));
        assert!(!policy.is_locked_out());
        assert_eq!(policy.failures(), 0);
    }

    #[test]
    fn test_success_clears_streak() {
        let mut policy = LockoutPolicy::new();
        let t0 = Instant::now();

        for _ in 0..4 {
            policy.record_failure(t0);
        }
        policy.record_success();
        assert_eq!(policy.failures(), 0);

        // One more failure after the reset does not engage
        assert!(!policy.record_failure(t0));
        assert!(!policy.is_locked_out());
    }

    #[test]
    fn test_success_clears_active_lockout() {
        let mut policy = LockoutPolicy::new();
        let t0 = Instant::now();

        for _ in 0..5 {
            policy.record_failure(t0);
        }
        assert!(policy.is_locked_out());

        // A success forces Normal even before the duration elapses
        policy.record_success();
        assert!(!policy.is_locked_out());
        assert_eq!(policy.failures(), 0);
    }

    #[test]
    fn test_custom_limits() {
        let mut policy = LockoutPolicy::with_limits(2, Duration::from_secs(5));
        let t0 = Instant::now();

        assert!(!policy.record_failure(t0));
        assert!(policy.record_failure(t0));
        assert!(policy.is_locked_out());
        assert!(policy.tick(t0 + Duration::from_secs(5)));
    }
}
