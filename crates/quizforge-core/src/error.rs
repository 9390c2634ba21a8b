//! Admission-control error types.

use thiserror::Error;

/// Failures surfaced by admission checks.
///
/// The three variants carry different retry semantics and must stay
/// distinguishable at the call site:
/// - `RateLimited` is transient; the caller may retry after a backoff.
/// - `QuotaExceeded` holds until the user's 24-hour window rolls over;
///   retrying immediately is pointless.
/// - `UnknownProvider` is a configuration bug, not a capacity signal, and
///   must never be retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("rate limit exceeded for user {user_id}")]
    RateLimited { user_id: String },

    #[error("daily token quota exceeded: {requested} tokens requested, {remaining} remaining")]
    QuotaExceeded { requested: u64, remaining: u64 },

    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

impl AdmissionError {
    /// Whether the caller may retry after a backoff.
    ///
    /// Only rate-limit rejections are transient; quota exhaustion lasts for
    /// the rest of the window and unknown providers are bugs.
    pub fn is_transient(&self) -> bool {
        matches!(self, AdmissionError::RateLimited { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_are_distinguishable_by_message() {
        let rate = AdmissionError::RateLimited {
            user_id: "u1".into(),
        };
        let quota = AdmissionError::QuotaExceeded {
            requested: 100,
            remaining: 10,
        };
        let unknown = AdmissionError::UnknownProvider("acme".into());

        assert_eq!(rate.to_string(), "rate limit exceeded for user u1");
        assert_eq!(
            quota.to_string(),
            "daily token quota exceeded: 100 tokens requested, 10 remaining"
        );
        assert_eq!(unknown.to_string(), "unknown provider: acme");
    }

    #[test]
    fn only_rate_limiting_is_transient() {
        assert!(
            AdmissionError::RateLimited {
                user_id: "u1".into()
            }
            .is_transient()
        );
        assert!(
            !AdmissionError::QuotaExceeded {
                requested: 1,
                remaining: 0
            }
            .is_transient()
        );
        assert!(!AdmissionError::UnknownProvider("x".into()).is_transient());
    }
}
