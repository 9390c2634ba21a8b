//! Shared per-provider outbound throttles.

use std::collections::HashMap;
use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};

use quizforge_core::AdmissionError;

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Aggregate outbound-rate gate, one bucket per configured provider.
///
/// Unlike the per-user limiter, each bucket here is shared by every caller:
/// it bounds the service's total call volume against the provider's terms,
/// not any individual user's behavior. Buckets are built eagerly at
/// construction and the provider set is closed for the throttle's lifetime;
/// querying a name outside that set is a configuration bug and is reported
/// as one instead of being allowed or denied.
pub struct ProviderThrottle {
    buckets: HashMap<String, DirectRateLimiter>,
}

impl ProviderThrottle {
    pub fn new(requests_per_minute: &HashMap<String, u32>) -> Self {
        let buckets = requests_per_minute
            .iter()
            .map(|(name, rpm)| {
                let ceiling = NonZeroU32::new((*rpm).max(1)).unwrap_or(NonZeroU32::MIN);
                (
                    name.clone(),
                    GovernorRateLimiter::direct(Quota::per_minute(ceiling)),
                )
            })
            .collect();

        Self { buckets }
    }

    /// Consume one unit from the provider's shared bucket.
    /// Returns `Ok(false)` when the bucket is empty; never waits.
    pub fn allow(&self, provider: &str) -> Result<bool, AdmissionError> {
        let bucket = self
            .buckets
            .get(provider)
            .ok_or_else(|| AdmissionError::UnknownProvider(provider.to_owned()))?;

        Ok(bucket.check().is_ok())
    }

    /// The configured provider names.
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }
}
