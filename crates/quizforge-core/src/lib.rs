//! # Quizforge Core
//!
//! The domain layer of the quizforge admission-control stack.
//! This crate contains the error taxonomy and port definitions with zero
//! infrastructure dependencies.

pub mod error;
pub mod ports;

pub use error::AdmissionError;
