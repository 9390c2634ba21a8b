//! Composition façade over the user, provider, and quota gates.

use async_trait::async_trait;

use quizforge_core::AdmissionError;
use quizforge_core::ports::{AdmissionControl, QuotaStatus};

use crate::metrics::{AdmissionMetrics, MetricsSnapshot};
use crate::provider::ProviderThrottle;
use crate::quota::TokenQuotaTracker;
use crate::settings::RateLimitSettings;
use crate::user::UserRequestLimiter;

/// The single entry point callers use for admission and settlement.
///
/// Two-phase protocol: [`admit`] with the pre-flight token estimate before
/// doing expensive work, then [`record_usage`] with the true cost once the
/// provider has answered. [`allow_provider`] is an independent gate,
/// consulted immediately before the outbound call, because it protects the
/// shared upstream relationship rather than any one user's fairness.
///
/// An admitted request that never settles simply undercounts the quota;
/// there is no in-flight state to reap.
///
/// [`admit`]: RateLimitCoordinator::admit
/// [`record_usage`]: RateLimitCoordinator::record_usage
/// [`allow_provider`]: RateLimitCoordinator::allow_provider
pub struct RateLimitCoordinator {
    users: UserRequestLimiter,
    providers: ProviderThrottle,
    quotas: TokenQuotaTracker,
    metrics: AdmissionMetrics,
}

impl RateLimitCoordinator {
    pub fn new(settings: &RateLimitSettings) -> Self {
        Self {
            users: UserRequestLimiter::new(settings.user_requests_per_minute),
            providers: ProviderThrottle::new(&settings.provider_requests_per_minute),
            quotas: TokenQuotaTracker::new(settings.user_tokens_per_day),
            metrics: AdmissionMetrics::default(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(&RateLimitSettings::from_env())
    }

    /// Admission phase: the user-rate gate, then the quota gate with the
    /// estimated cost. The first failing gate rejects and nothing is
    /// recorded; the estimate is only settled later via [`record_usage`].
    ///
    /// [`record_usage`]: RateLimitCoordinator::record_usage
    pub fn admit(&self, user_id: &str, estimated_tokens: u64) -> Result<(), AdmissionError> {
        if !self.allow_user(user_id) {
            return Err(AdmissionError::RateLimited {
                user_id: user_id.to_owned(),
            });
        }

        self.check_quota(user_id, estimated_tokens)?;

        self.metrics.record_admitted();
        tracing::debug!(
            "admitted user {} for an estimated {} tokens",
            user_id,
            estimated_tokens
        );
        Ok(())
    }

    /// Consume one unit from the user's request-rate bucket.
    pub fn allow_user(&self, user_id: &str) -> bool {
        let allowed = self.users.allow(user_id);
        if !allowed {
            self.metrics.record_user_rate_limited();
            tracing::warn!("request rate exceeded for user {}", user_id);
        }
        allowed
    }

    /// Check the estimated cost against the user's daily budget.
    pub fn check_quota(&self, user_id: &str, tokens: u64) -> Result<(), AdmissionError> {
        self.quotas.check_quota(user_id, tokens).inspect_err(|_| {
            self.metrics.record_quota_exceeded();
            tracing::warn!(
                "daily token quota exhausted for user {} ({} requested)",
                user_id,
                tokens
            );
        })
    }

    /// Settlement phase: record the actual cost of completed work.
    pub fn record_usage(&self, user_id: &str, tokens: u64) {
        self.quotas.record_usage(user_id, tokens);
        self.metrics.record_settled(tokens);
        tracing::debug!("settled {} tokens for user {}", tokens, user_id);
    }

    pub fn remaining_tokens(&self, user_id: &str) -> u64 {
        self.quotas.remaining_tokens(user_id)
    }

    /// Support override: zero the user's usage and restart their window.
    pub fn reset_quota(&self, user_id: &str) {
        self.quotas.reset_quota(user_id);
        tracing::info!("quota manually reset for user {}", user_id);
    }

    /// Consume one unit from the shared per-provider bucket. Independent of
    /// the user-level admission decision.
    pub fn allow_provider(&self, provider: &str) -> Result<bool, AdmissionError> {
        let allowed = self.providers.allow(provider)?;
        if !allowed {
            self.metrics.record_provider_rate_limited();
            tracing::warn!("outbound rate exceeded for provider {}", provider);
        }
        Ok(allowed)
    }

    pub fn daily_token_limit(&self) -> u64 {
        self.quotas.daily_limit()
    }

    /// Telemetry snapshot of one user's quota.
    pub fn quota_status(&self, user_id: &str) -> QuotaStatus {
        self.quotas.quota_status(user_id)
    }

    /// Current decision counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of users with quota state, for capacity gauges.
    pub fn tracked_users(&self) -> usize {
        self.quotas.tracked_users()
    }
}

#[async_trait]
impl AdmissionControl for RateLimitCoordinator {
    async fn allow_user(&self, user_id: &str) -> bool {
        RateLimitCoordinator::allow_user(self, user_id)
    }

    async fn check_quota(&self, user_id: &str, tokens: u64) -> Result<(), AdmissionError> {
        RateLimitCoordinator::check_quota(self, user_id, tokens)
    }

    async fn record_usage(&self, user_id: &str, tokens: u64) {
        RateLimitCoordinator::record_usage(self, user_id, tokens)
    }

    async fn remaining_tokens(&self, user_id: &str) -> u64 {
        RateLimitCoordinator::remaining_tokens(self, user_id)
    }

    async fn reset_quota(&self, user_id: &str) {
        RateLimitCoordinator::reset_quota(self, user_id)
    }

    async fn allow_provider(&self, provider: &str) -> Result<bool, AdmissionError> {
        RateLimitCoordinator::allow_provider(self, provider)
    }

    fn daily_token_limit(&self) -> u64 {
        RateLimitCoordinator::daily_token_limit(self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(rpm: u32, tokens_per_day: u64) -> RateLimitSettings {
        RateLimitSettings {
            user_requests_per_minute: rpm,
            user_tokens_per_day: tokens_per_day,
            provider_requests_per_minute: HashMap::from([("openai".to_string(), 3)]),
        }
    }

    #[test]
    fn admit_then_settle_updates_the_budget() {
        let coordinator = RateLimitCoordinator::new(&settings(10, 1000));

        coordinator.admit("u1", 200).unwrap();
        coordinator.record_usage("u1", 240);

        // Settlement used the actual cost, not the estimate.
        assert_eq!(coordinator.remaining_tokens("u1"), 760);
        assert_eq!(coordinator.daily_token_limit(), 1000);

        let snapshot = coordinator.metrics();
        assert_eq!(snapshot.admitted, 1);
        assert_eq!(snapshot.tokens_settled, 240);
    }

    #[test]
    fn rejection_by_rate_records_nothing() {
        let coordinator = RateLimitCoordinator::new(&settings(1, 1000));

        coordinator.admit("u1", 10).unwrap();
        let err = coordinator.admit("u1", 10).unwrap_err();
        assert_eq!(
            err,
            AdmissionError::RateLimited {
                user_id: "u1".to_string()
            }
        );

        // The rejected attempt left the quota untouched.
        assert_eq!(coordinator.remaining_tokens("u1"), 1000);
        assert_eq!(coordinator.metrics().user_rate_limited, 1);
    }

    #[test]
    fn rejection_by_quota_is_not_a_rate_event() {
        let coordinator = RateLimitCoordinator::new(&settings(10, 100));
        coordinator.record_usage("u1", 90);

        let err = coordinator.admit("u1", 50).unwrap_err();
        assert!(matches!(err, AdmissionError::QuotaExceeded { .. }));

        let snapshot = coordinator.metrics();
        assert_eq!(snapshot.quota_exceeded, 1);
        assert_eq!(snapshot.user_rate_limited, 0);
        assert_eq!(snapshot.admitted, 0);
    }

    #[test]
    fn provider_gate_is_independent_of_user_admission() {
        let coordinator = RateLimitCoordinator::new(&settings(10, 1000));

        // Drain the provider bucket without any user having been admitted.
        assert!(coordinator.allow_provider("openai").unwrap());
        assert!(coordinator.allow_provider("openai").unwrap());
        assert!(coordinator.allow_provider("openai").unwrap());
        assert!(!coordinator.allow_provider("openai").unwrap());

        // User admission still works.
        coordinator.admit("u1", 10).unwrap();
        assert_eq!(coordinator.metrics().provider_rate_limited, 1);
    }

    #[test]
    fn unknown_provider_surfaces_the_configuration_bug() {
        let coordinator = RateLimitCoordinator::new(&settings(10, 1000));

        let err = coordinator.allow_provider("acme-llm").unwrap_err();
        assert_eq!(err, AdmissionError::UnknownProvider("acme-llm".to_string()));
        // Not counted as a capacity event.
        assert_eq!(coordinator.metrics().provider_rate_limited, 0);
    }

    #[test]
    fn reset_quota_reopens_the_budget() {
        let coordinator = RateLimitCoordinator::new(&settings(10, 100));
        coordinator.record_usage("u1", 100);
        assert!(coordinator.check_quota("u1", 1).is_err());

        coordinator.reset_quota("u1");
        assert!(coordinator.check_quota("u1", 100).is_ok());
    }

    #[tokio::test]
    async fn coordinator_serves_as_the_admission_port() {
        let coordinator: std::sync::Arc<dyn AdmissionControl> =
            std::sync::Arc::new(RateLimitCoordinator::new(&settings(10, 1000)));

        assert!(coordinator.allow_user("u1").await);
        coordinator.check_quota("u1", 300).await.unwrap();
        coordinator.record_usage("u1", 300).await;
        assert_eq!(coordinator.remaining_tokens("u1").await, 700);
        assert!(coordinator.allow_provider("openai").await.unwrap());
        assert_eq!(coordinator.daily_token_limit(), 1000);

        coordinator.reset_quota("u1").await;
        assert_eq!(coordinator.remaining_tokens("u1").await, 1000);
    }
}
