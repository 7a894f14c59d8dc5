//! Resilience primitives.
//!
//! # Design Decisions
//! - Retries are bounded and apply only to transient registry failures;
//!   the vulnerability gate is never retried with different thresholds
//! - Jittered exponential backoff avoids synchronized retry storms

pub mod backoff;
