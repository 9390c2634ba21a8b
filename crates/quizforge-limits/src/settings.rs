//! Rate-limit configuration loaded from environment variables.

use std::collections::HashMap;
use std::env;

use serde::{Deserialize, Serialize};

/// Admission-control settings, immutable for the coordinator's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Request-rate ceiling per user, per minute.
    pub user_requests_per_minute: u32,
    /// Token budget per user over a rolling 24-hour window.
    pub user_tokens_per_day: u64,
    /// Aggregate outbound request-rate ceiling per provider, per minute.
    /// The key set defines the closed set of known providers.
    pub provider_requests_per_minute: HashMap<String, u32>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            user_requests_per_minute: 30,
            user_tokens_per_day: 100_000,
            provider_requests_per_minute: HashMap::from([
                ("openai".to_string(), 60),
                ("anthropic".to_string(), 60),
            ]),
        }
    }
}

impl RateLimitSettings {
    /// Load settings from environment variables, falling back to defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let providers = Self::parse_provider_limits(env::vars());

        Self {
            user_requests_per_minute: env::var("USER_REQUESTS_PER_MINUTE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.user_requests_per_minute),
            user_tokens_per_day: env::var("USER_TOKENS_PER_DAY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.user_tokens_per_day),
            provider_requests_per_minute: if providers.is_empty() {
                defaults.provider_requests_per_minute
            } else {
                providers
            },
        }
    }

    /// Parse per-provider ceilings from environment variables.
    /// Format: PROVIDER_RPM_<NAME>=<requests per minute>
    /// Example: PROVIDER_RPM_OPENAI=60
    fn parse_provider_limits(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, u32> {
        let mut limits = HashMap::new();

        for (key, value) in vars {
            if let Some(name) = key.strip_prefix("PROVIDER_RPM_") {
                if let Ok(rpm) = value.parse::<u32>() {
                    limits.insert(name.to_lowercase(), rpm);
                }
            }
        }

        limits
    }
}
