//! Release pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Revision + Trigger
//!     → builder.rs (run build steps, detect identity reuse)
//!     → Artifact (immutable, tag = revision hash)
//!     → scanner.rs (external tool, JSON findings; outage fails closed)
//!     → ScanResult
//!     → gate.rs (pure decision: Block iff any CRITICAL)
//!     → ClearedArtifact (only exists after Pass)
//!     → publisher.rs (trigger isolation, idempotent push)
//!     → PublicationRecord
//! ```
//!
//! # Design Decisions
//! - Stages are orchestrated by runner.rs as an explicit state machine
//! - A cancelled run stops between stages, never after the publish write
//! - Pull-request builds can run the full gate but never reach the registry

pub mod artifact;
pub mod builder;
pub mod gate;
pub mod publisher;
pub mod runner;
pub mod scanner;

#[cfg(test)]
pub(crate) mod testutil;

pub use artifact::{Artifact, ImageManifest, Revision, Trigger};
pub use builder::{ArtifactBuilder, BuildError, BuildExecutor, ProcessExecutor};
pub use gate::{decide, ClearedArtifact, Finding, GateDecision, ScanResult, Severity};
pub use publisher::{PublicationRecord, PublishError, PublishOutcome, Publisher, SkipReason};
pub use runner::{PipelineError, PipelineRunner, RunOutcome, Stage};
pub use scanner::{CommandScanner, ScanError, Scanner};
