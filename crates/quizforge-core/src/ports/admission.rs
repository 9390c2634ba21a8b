//! Admission-control port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AdmissionError;

/// Admission-control trait - abstraction over the rate-limit/quota backend.
///
/// Callers follow a two-phase protocol: check `allow_user` and `check_quota`
/// with an estimated cost before doing expensive work, then call
/// `record_usage` with the actual cost once it is known. Provider throttling
/// is an independent gate consulted immediately before the outbound call.
///
/// None of these operations suspend; the in-memory backend answers
/// immediately. The trait is async so a distributed backend can implement
/// the same surface.
#[async_trait]
pub trait AdmissionControl: Send + Sync {
    /// Consume one unit from the user's request-rate bucket.
    /// Returns false the instant the bucket is empty; never waits.
    async fn allow_user(&self, user_id: &str) -> bool;

    /// Check whether `tokens` more tokens fit in the user's daily budget.
    /// Read-only: does not reserve or deduct.
    async fn check_quota(&self, user_id: &str, tokens: u64) -> Result<(), AdmissionError>;

    /// Settle the actual token cost of completed work. Unconditional: the
    /// accumulator may exceed the daily limit if admission raced.
    async fn record_usage(&self, user_id: &str, tokens: u64);

    /// Tokens still available in the user's current window, saturating at 0.
    async fn remaining_tokens(&self, user_id: &str) -> u64;

    /// Administrative override: zero the user's usage and restart the window.
    async fn reset_quota(&self, user_id: &str);

    /// Consume one unit from the shared per-provider bucket.
    /// Unknown provider names are configuration bugs, not capacity events.
    async fn allow_provider(&self, provider: &str) -> Result<bool, AdmissionError>;

    /// The configured per-user daily token ceiling.
    fn daily_token_limit(&self) -> u64;
}

/// Snapshot of a user's quota state, for telemetry and support tooling.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    /// Tokens still available in the current window (saturating at 0).
    pub remaining: u64,
    /// The daily ceiling this user was created with.
    pub daily_limit: u64,
    /// When the current 24-hour window opened.
    pub window_started_at: DateTime<Utc>,
}
