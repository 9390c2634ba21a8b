//! Per-user token accounting over a rolling 24-hour window.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::one::RefMut;

use quizforge_core::AdmissionError;
use quizforge_core::ports::QuotaStatus;

/// A single user's quota state.
///
/// `tokens_used` only ever grows within a window; the sole decrements are a
/// window roll-over or an administrative reset. Settlement is unconditional,
/// so the accumulator may legitimately sit above `daily_limit` after a race
/// between two admitted requests.
#[derive(Debug)]
struct TokenQuota {
    tokens_used: u64,
    window_start: DateTime<Utc>,
    daily_limit: u64,
}

impl TokenQuota {
    fn new(daily_limit: u64, now: DateTime<Utc>) -> Self {
        Self {
            tokens_used: 0,
            window_start: now,
            daily_limit,
        }
    }

    /// Reset-on-access: open a fresh window if the current one has expired.
    /// There is no background sweep; an untouched entry stays stale until
    /// the next touch re-synchronizes it here.
    fn roll_if_expired(&mut self, now: DateTime<Utc>) {
        if now.signed_duration_since(self.window_start) >= TimeDelta::hours(24) {
            self.tokens_used = 0;
            self.window_start = now;
        }
    }

    fn remaining(&self) -> u64 {
        self.daily_limit.saturating_sub(self.tokens_used)
    }
}

/// Tracks per-user token consumption against a rolling daily budget.
///
/// Entries are created lazily on first touch and live for the life of the
/// process. Operations on the same user serialize on the map's shard locks,
/// so concurrent settlements never lose an increment, while different users
/// proceed independently.
///
/// Checking and settling are deliberately split: `check_quota` never
/// reserves, so two concurrently admitted requests can together overrun the
/// budget by one request's worth of tokens. The budget is a soft limit.
pub struct TokenQuotaTracker {
    quotas: DashMap<String, TokenQuota>,
    daily_limit: u64,
}

impl TokenQuotaTracker {
    pub fn new(daily_limit: u64) -> Self {
        Self {
            quotas: DashMap::new(),
            daily_limit,
        }
    }

    /// Would `tokens_requested` more tokens still fit in the user's budget?
    ///
    /// Read-only with respect to the accumulator: nothing is deducted, the
    /// caller settles the true cost later via [`record_usage`].
    ///
    /// [`record_usage`]: TokenQuotaTracker::record_usage
    pub fn check_quota(&self, user_id: &str, tokens_requested: u64) -> Result<(), AdmissionError> {
        self.check_quota_at(user_id, tokens_requested, Utc::now())
    }

    pub(crate) fn check_quota_at(
        &self,
        user_id: &str,
        tokens_requested: u64,
        now: DateTime<Utc>,
    ) -> Result<(), AdmissionError> {
        let mut quota = self.entry(user_id, now);
        quota.roll_if_expired(now);

        if quota.tokens_used.saturating_add(tokens_requested) > quota.daily_limit {
            return Err(AdmissionError::QuotaExceeded {
                requested: tokens_requested,
                remaining: quota.remaining(),
            });
        }

        Ok(())
    }

    /// Settle the actual cost of completed work.
    ///
    /// Unconditional: the increment applies to whatever window is open at
    /// settlement time, even past the limit. Creating the entry on demand
    /// guards against usage reported before any check.
    pub fn record_usage(&self, user_id: &str, tokens_used: u64) {
        self.record_usage_at(user_id, tokens_used, Utc::now());
    }

    pub(crate) fn record_usage_at(&self, user_id: &str, tokens_used: u64, now: DateTime<Utc>) {
        let mut quota = self.entry(user_id, now);
        quota.roll_if_expired(now);
        quota.tokens_used = quota.tokens_used.saturating_add(tokens_used);
    }

    /// Tokens still available in the user's current window, saturating at 0.
    pub fn remaining_tokens(&self, user_id: &str) -> u64 {
        self.remaining_tokens_at(user_id, Utc::now())
    }

    pub(crate) fn remaining_tokens_at(&self, user_id: &str, now: DateTime<Utc>) -> u64 {
        let mut quota = self.entry(user_id, now);
        quota.roll_if_expired(now);
        quota.remaining()
    }

    /// Administrative override: zero the usage and restart the window now,
    /// regardless of elapsed time.
    pub fn reset_quota(&self, user_id: &str) {
        self.quotas.insert(
            user_id.to_owned(),
            TokenQuota::new(self.daily_limit, Utc::now()),
        );
    }

    /// Snapshot of a user's quota for telemetry and support tooling.
    pub fn quota_status(&self, user_id: &str) -> QuotaStatus {
        self.quota_status_at(user_id, Utc::now())
    }

    pub(crate) fn quota_status_at(&self, user_id: &str, now: DateTime<Utc>) -> QuotaStatus {
        let mut quota = self.entry(user_id, now);
        quota.roll_if_expired(now);

        QuotaStatus {
            remaining: quota.remaining(),
            daily_limit: quota.daily_limit,
            window_started_at: quota.window_start,
        }
    }

    pub fn daily_limit(&self) -> u64 {
        self.daily_limit
    }

    /// Number of users with quota state, stale entries included.
    pub fn tracked_users(&self) -> usize {
        self.quotas.len()
    }

    fn entry(&self, user_id: &str, now: DateTime<Utc>) -> RefMut<'_, String, TokenQuota> {
        self.quotas
            .entry(user_id.to_owned())
            .or_insert_with(|| TokenQuota::new(self.daily_limit, now))
    }
}
