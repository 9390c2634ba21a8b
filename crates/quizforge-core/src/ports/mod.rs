//! Ports - trait definitions for the admission-control surface.
//! These are the "interfaces" that infrastructure must implement.

mod admission;

pub use admission::{AdmissionControl, QuotaStatus};
