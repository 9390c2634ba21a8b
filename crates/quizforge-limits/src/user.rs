//! Per-user request rate limiting using the governor crate.

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter as GovernorRateLimiter};

type KeyedRateLimiter = GovernorRateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// Per-user request-rate gate.
///
/// One token bucket per user identifier, created atomically on first use by
/// the keyed state store. Each bucket refills at the configured steady rate
/// and holds a burst capacity equal to the full per-minute ceiling, so an
/// idle user can spend a whole minute's allowance at once before settling
/// back to the steady rate.
///
/// Entries live for the life of the process; eviction of idle users is left
/// to an outer layer if it ever matters.
pub struct UserRequestLimiter {
    limiter: KeyedRateLimiter,
    requests_per_minute: u32,
}

impl UserRequestLimiter {
    /// A zero ceiling is clamped to one request per minute rather than
    /// rejecting everything.
    pub fn new(requests_per_minute: u32) -> Self {
        let ceiling =
            NonZeroU32::new(requests_per_minute.max(1)).unwrap_or(NonZeroU32::MIN);

        Self {
            limiter: GovernorRateLimiter::keyed(Quota::per_minute(ceiling)),
            requests_per_minute: ceiling.get(),
        }
    }

    /// Consume one unit from the user's bucket.
    /// Returns false the instant the bucket is empty; never waits or queues.
    pub fn allow(&self, user_id: &str) -> bool {
        self.limiter.check_key(&user_id.to_owned()).is_ok()
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }

    /// Number of users with live limiter state.
    pub fn tracked_users(&self) -> usize {
        self.limiter.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_user_can_burst_up_to_the_ceiling_then_is_denied() {
        let limiter = UserRequestLimiter::new(5);

        for i in 0..5 {
            assert!(limiter.allow("user-a"), "call {i} should pass");
        }
        assert!(!limiter.allow("user-a"), "burst+1 must be denied");
    }

    #[test]
    fn users_do_not_share_buckets() {
        let limiter = UserRequestLimiter::new(2);

        assert!(limiter.allow("user-a"));
        assert!(limiter.allow("user-a"));
        assert!(!limiter.allow("user-a"));

        // A different user is unaffected by user-a's exhaustion.
        assert!(limiter.allow("user-b"));
        assert_eq!(limiter.tracked_users(), 2);
    }

    #[test]
    fn zero_ceiling_clamps_to_one() {
        let limiter = UserRequestLimiter::new(0);

        assert_eq!(limiter.requests_per_minute(), 1);
        assert!(limiter.allow("user-a"));
        assert!(!limiter.allow("user-a"));
    }
}
