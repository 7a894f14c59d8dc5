//! Vulnerability gate: the pass/block decision over scan findings.
//!
//! # Design Decisions
//! - The decision is a pure function of one scan result; no retries with
//!   different thresholds and no override path
//! - Block iff any CRITICAL finding exists; LOW/MEDIUM/HIGH counts never
//!   block on their own (severity accumulation over time is out of scope)

use serde::{Deserialize, Serialize};

use crate::pipeline::artifact::Artifact;

/// Finding severity taxonomy, ordered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// One vulnerability finding reported by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Advisory identifier (e.g., a CVE id).
    pub id: String,

    pub severity: Severity,

    /// Package the finding was located in.
    pub package: String,
}

/// Scan findings attached 1:1 to an artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Tag of the scanned artifact.
    pub artifact_tag: String,

    pub findings: Vec<Finding>,
}

impl ScanResult {
    pub fn count(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }
}

/// Outcome of gating a scan result.
#[derive(Debug, Clone)]
pub enum GateDecision {
    Pass,
    /// At least one CRITICAL finding; the artifact never becomes
    /// publishable.
    Block { critical: Vec<Finding> },
}

impl GateDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, GateDecision::Pass)
    }

    /// Clear an artifact for publication.
    ///
    /// Returns `None` for a blocked decision, so a blocked artifact cannot
    /// even be handed to the publisher.
    pub fn clear<'a>(&self, artifact: &'a Artifact) -> Option<ClearedArtifact<'a>> {
        match self {
            GateDecision::Pass => Some(ClearedArtifact { artifact }),
            GateDecision::Block { .. } => None,
        }
    }
}

/// An artifact that passed the gate. Only constructible through
/// [`GateDecision::clear`].
#[derive(Debug, Clone, Copy)]
pub struct ClearedArtifact<'a> {
    artifact: &'a Artifact,
}

impl<'a> ClearedArtifact<'a> {
    pub fn artifact(&self) -> &'a Artifact {
        self.artifact
    }
}

/// Gate a scan result.
pub fn decide(scan: &ScanResult) -> GateDecision {
    let critical: Vec<Finding> = scan
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Critical)
        .cloned()
        .collect();

    if critical.is_empty() {
        GateDecision::Pass
    } else {
        GateDecision::Block { critical }
    }
}
