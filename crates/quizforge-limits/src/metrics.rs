//! Decision counters for an external metrics collector.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters bumped at each admission decision point.
///
/// Relaxed ordering throughout: these feed dashboards, not control flow,
/// and momentary skew between counters is fine.
#[derive(Debug, Default)]
pub struct AdmissionMetrics {
    admitted: AtomicU64,
    user_rate_limited: AtomicU64,
    provider_rate_limited: AtomicU64,
    quota_exceeded: AtomicU64,
    tokens_settled: AtomicU64,
}

impl AdmissionMetrics {
    pub(crate) fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_user_rate_limited(&self) {
        self.user_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_provider_rate_limited(&self) {
        self.provider_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_quota_exceeded(&self) {
        self.quota_exceeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_settled(&self, tokens: u64) {
        self.tokens_settled.fetch_add(tokens, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            admitted: self.admitted.load(Ordering::Relaxed),
            user_rate_limited: self.user_rate_limited.load(Ordering::Relaxed),
            provider_rate_limited: self.provider_rate_limited.load(Ordering::Relaxed),
            quota_exceeded: self.quota_exceeded.load(Ordering::Relaxed),
            tokens_settled: self.tokens_settled.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of the admission counters, ready for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Requests that passed both admission gates.
    pub admitted: u64,
    /// Rejections by the per-user request-rate gate.
    pub user_rate_limited: u64,
    /// Rejections by a per-provider throttle.
    pub provider_rate_limited: u64,
    /// Rejections by the daily token budget.
    pub quota_exceeded: u64,
    /// Total tokens settled across all users.
    pub tokens_settled: u64,
}

impl MetricsSnapshot {
    /// Fraction of admission attempts that were rejected.
    pub fn rejection_rate(&self) -> f64 {
        let rejected = self.user_rate_limited + self.quota_exceeded;
        let total = self.admitted + rejected;
        if total == 0 {
            0.0
        } else {
            rejected as f64 / total as f64
        }
    }
}
