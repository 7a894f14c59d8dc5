//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging with request/run correlation fields
//! - Secrets never reach log output: registry tokens redact their `Debug`,
//!   database URLs log only through the redaction helper
//! - Metrics are cheap and never fail the caller

pub mod logging;
pub mod metrics;
