//! Per-onboarding upload rate limiting on top of `governor`.
//!
//! Advisory only: it protects a single server process from a burst of
//! uploads for one onboarding, it is not an abuse control. The whole
//! allowance is available as a burst; spent attempts come back one every
//! `window / limit`.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::types::DbId;

/// Default number of attempts allowed per window.
pub const DEFAULT_UPLOAD_ATTEMPTS: u32 = 5;

/// Default window length.
pub const DEFAULT_UPLOAD_WINDOW: Duration = Duration::from_secs(60);

/// Returned when a key has exhausted its allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    /// Time until the next attempt would be accepted.
    pub retry_after: Duration,
}

/// Upload attempts keyed by onboarding id.
pub struct UploadRateLimiter {
    limiter: DefaultKeyedRateLimiter<DbId>,
}

impl UploadRateLimiter {
    /// Allow `limit` attempts per `window` for each onboarding.
    ///
    /// A zero `limit` is treated as one.
    pub fn new(limit: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(window / burst.get())
            .map(|quota| quota.allow_burst(burst))
            .unwrap_or_else(|| Quota::per_second(burst));
        Self {
            limiter: RateLimiter::keyed(quota),
        }
    }

    /// Record an attempt for `onboarding_id`.
    ///
    /// Rejected attempts are not recorded, so a caller hammering a limited
    /// key does not extend its own lockout.
    pub fn check(&self, onboarding_id: DbId) -> Result<(), RateLimited> {
        self.limiter
            .check_key(&onboarding_id)
            .map_err(|not_until| RateLimited {
                retry_after: not_until.wait_time_from(DefaultClock::default().now()),
            })
    }

    /// Drop keys whose allowance has fully recovered. Run periodically so
    /// finished onboardings do not pile up.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of onboardings currently tracked.
    pub fn tracked(&self) -> usize {
        self.limiter.len()
    }
}

impl Default for UploadRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_UPLOAD_ATTEMPTS, DEFAULT_UPLOAD_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixth_attempt_in_window_is_rejected() {
        let limiter = UploadRateLimiter::default();
        for _ in 0..5 {
            assert!(limiter.check(1).is_ok());
        }
        let err = limiter.check(1).unwrap_err();
        assert!(err.retry_after > Duration::ZERO);
        assert!(err.retry_after <= Duration::from_secs(12));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = UploadRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check(1).is_ok());
        assert!(limiter.check(2).is_ok());
        assert!(limiter.check(1).is_err());
        assert_eq!(limiter.tracked(), 2);
    }

    #[test]
    fn rejected_attempts_are_not_counted() {
        let limiter = UploadRateLimiter::new(1, Duration::from_millis(40));
        limiter.check(1).unwrap();
        for _ in 0..20 {
            assert!(limiter.check(1).is_err());
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.check(1).is_ok());
    }

    #[test]
    fn recovered_keys_are_dropped() {
        let limiter = UploadRateLimiter::new(1, Duration::from_millis(20));
        for id in 0..1_000 {
            limiter.check(id).unwrap();
        }
        assert_eq!(limiter.tracked(), 1_000);

        std::thread::sleep(Duration::from_millis(60));
        limiter.retain_recent();
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn busy_keys_survive_retention() {
        let limiter = UploadRateLimiter::default();
        limiter.check(1).unwrap();
        limiter.retain_recent();
        assert_eq!(limiter.tracked(), 1);
    }
}
