//! # Quizforge Limits
//!
//! Concrete in-memory implementation of the admission-control port defined
//! in `quizforge-core`: per-user request rate limiting, per-provider
//! outbound throttling, and rolling daily token quotas.
//!
//! All state is process-local. When the service runs as multiple replicas,
//! each replica enforces its own independent limits.

pub mod coordinator;
pub mod metrics;
pub mod provider;
pub mod quota;
pub mod settings;
pub mod user;

pub use coordinator::RateLimitCoordinator;
pub use metrics::{AdmissionMetrics, MetricsSnapshot};
pub use provider::ProviderThrottle;
pub use quota::TokenQuotaTracker;
pub use settings::RateLimitSettings;
pub use user::UserRequestLimiter;
