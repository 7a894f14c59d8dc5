//! Artifact builder.
//!
//! # Responsibilities
//! - Run the configured build steps in order for a revision
//! - Report the first failing step by name
//! - Detect identity reuse: the same tag must never carry different content
//!
//! # Design Decisions
//! - Identity is derived from the revision alone, so rebuilds of the same
//!   revision collide on purpose; a collision with an identical digest is a
//!   no-op rebuild, a collision with a different digest is a policy
//!   violation and fails the build
//! - No partial publish: an Artifact is returned only on full success, and
//!   the builder itself never writes to the registry

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::config::{BuildStepConfig, PipelineConfig};
use crate::pipeline::artifact::{Artifact, ImageManifest, Revision};
use crate::registry::{ImageRegistry, RegistryError};

/// Error type for build execution.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A named build step failed (non-zero exit, spawn failure, timeout).
    #[error("build step '{step}' failed: {detail}")]
    StepFailed { step: String, detail: String },

    /// The registry already holds this tag with different content.
    #[error(
        "identity reuse for tag {tag}: registry digest {existing} != built digest {built}"
    )]
    IdentityReuse {
        tag: String,
        existing: String,
        built: String,
    },

    /// The pre-publish registry probe failed.
    #[error("registry probe failed: {0}")]
    Probe(#[from] RegistryError),
}

/// Seam through which build steps execute and the finished image is
/// described. Production uses [`ProcessExecutor`]; tests substitute a fake.
#[async_trait]
pub trait BuildExecutor: Send + Sync {
    /// Run one build step for the revision. Non-zero exit is a failure.
    async fn run_step(&self, step: &BuildStepConfig, revision: &Revision)
        -> Result<(), BuildError>;

    /// Describe the finished image for the revision.
    async fn finish(&self, revision: &Revision) -> Result<ImageManifest, BuildError>;
}

/// Executes build steps as child processes with a bounded timeout and
/// digests the resulting image archive.
///
/// The packaging step drops `{revision}.tar` into the output directory and
/// may drop `{revision}.base` alongside it, naming the digest of the base
/// image the build started from.
pub struct ProcessExecutor {
    output_dir: PathBuf,
    step_timeout: Duration,
}

impl ProcessExecutor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.output_dir),
            step_timeout: Duration::from_secs(config.step_timeout_secs),
        }
    }
}

#[async_trait]
impl BuildExecutor for ProcessExecutor {
    async fn run_step(
        &self,
        step: &BuildStepConfig,
        revision: &Revision,
    ) -> Result<(), BuildError> {
        let step_failed = |detail: String| BuildError::StepFailed {
            step: step.name.clone(),
            detail,
        };

        let exe = step
            .command
            .first()
            .ok_or_else(|| step_failed("empty command".to_string()))?;

        let child = Command::new(exe)
            .args(&step.command[1..])
            .env("SHIPGATE_REVISION", revision.as_str())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| step_failed(e.to_string()))?;

        let output = tokio::time::timeout(self.step_timeout, child.wait_with_output())
            .await
            .map_err(|_| step_failed(format!("timed out after {:?}", self.step_timeout)))?
            .map_err(|e| step_failed(e.to_string()))?;

        if output.status.success() {
            tracing::debug!(step = %step.name, revision = %revision, "Build step passed");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(step_failed(format!(
                "exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )))
        }
    }

    async fn finish(&self, revision: &Revision) -> Result<ImageManifest, BuildError> {
        let path = self.output_dir.join(format!("{revision}.tar"));
        let manifest_failed = |detail: String| BuildError::StepFailed {
            step: "manifest".to_string(),
            detail,
        };

        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| manifest_failed(format!("{}: {e}", path.display())))?;

        let mut hasher = Sha256::new();
        let mut size_bytes = 0u64;
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = file
                .read(&mut buf)
                .await
                .map_err(|e| manifest_failed(e.to_string()))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            size_bytes += n as u64;
        }

        let base_path = self.output_dir.join(format!("{revision}.base"));
        let base_digest = match tokio::fs::read_to_string(&base_path).await {
            Ok(digest) => digest.trim().to_string(),
            // No sidecar: the image was built from scratch.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(manifest_failed(format!("{}: {e}", base_path.display())));
            }
        };

        Ok(ImageManifest {
            base_digest,
            content_digest: format!("sha256:{}", hex::encode(hasher.finalize())),
            size_bytes,
        })
    }
}

/// Builds immutable, identity-tagged artifacts from source revisions.
pub struct ArtifactBuilder<'a> {
    executor: &'a dyn BuildExecutor,
    steps: &'a [BuildStepConfig],
}

impl<'a> ArtifactBuilder<'a> {
    pub fn new(executor: &'a dyn BuildExecutor, steps: &'a [BuildStepConfig]) -> Self {
        Self { executor, steps }
    }

    /// Build the revision into an artifact.
    ///
    /// Idempotent per identity: if the registry already records this tag,
    /// an identical digest makes the rebuild a no-op and a differing digest
    /// fails with [`BuildError::IdentityReuse`].
    pub async fn build(
        &self,
        revision: &Revision,
        registry: &dyn ImageRegistry,
        repository: &str,
    ) -> Result<Artifact, BuildError> {
        for step in self.steps {
            self.executor.run_step(step, revision).await?;
        }

        let manifest = self.executor.finish(revision).await?;

        if let Some(existing) = registry.tag_digest(repository, revision.as_str()).await? {
            if existing != manifest.content_digest {
                return Err(BuildError::IdentityReuse {
                    tag: revision.as_str().to_string(),
                    existing,
                    built: manifest.content_digest,
                });
            }
            tracing::info!(revision = %revision, "Identity already in registry with matching content; no-op rebuild");
        }

        Ok(Artifact {
            revision: revision.clone(),
            built_at: Utc::now(),
            manifest,
        })
    }
}
