//! Vulnerability scanning of built artifacts.
//!
//! # Design Decisions
//! - A scanner failure (tool crash, timeout, unreadable output) is
//!   `ScanError::Unavailable`, a distinct outcome from a Block decision —
//!   it is never coerced into a Pass (fail closed)

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::pipeline::artifact::Artifact;
use crate::pipeline::gate::{Finding, ScanResult};

/// Error type for scan execution.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The scan could not be performed at all. Treated as a pipeline
    /// failure, never as a Pass.
    #[error("scanner unavailable: {0}")]
    Unavailable(String),
}

/// Seam to the vulnerability scanner. Production uses [`CommandScanner`];
/// tests substitute a fake.
#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan(&self, artifact: &Artifact) -> Result<ScanResult, ScanError>;
}

/// Runs an external scanner command and parses its JSON findings.
///
/// The artifact tag is appended as the final argument; the tool must emit a
/// JSON array of `{id, severity, package}` objects on stdout.
pub struct CommandScanner {
    command: Vec<String>,
    timeout: Duration,
}

impl CommandScanner {
    pub fn new(command: Vec<String>, timeout: Duration) -> Self {
        Self { command, timeout }
    }
}

#[async_trait]
impl Scanner for CommandScanner {
    async fn scan(&self, artifact: &Artifact) -> Result<ScanResult, ScanError> {
        let exe = self
            .command
            .first()
            .ok_or_else(|| ScanError::Unavailable("no scanner command configured".to_string()))?;

        let child = Command::new(exe)
            .args(&self.command[1..])
            .arg(artifact.tag())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ScanError::Unavailable(e.to_string()))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ScanError::Unavailable(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| ScanError::Unavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScanError::Unavailable(format!(
                "scanner exited with {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let findings: Vec<Finding> = serde_json::from_slice(&output.stdout)
            .map_err(|e| ScanError::Unavailable(format!("unparseable scanner output: {e}")))?;

        tracing::debug!(
            tag = artifact.tag(),
            findings = findings.len(),
            "Scan completed"
        );

        Ok(ScanResult {
            artifact_tag: artifact.tag().to_string(),
            findings,
        })
    }
}
