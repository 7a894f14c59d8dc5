//! Artifact publication.
//!
//! # Responsibilities
//! - Push gated artifacts to the registry under tag = revision hash
//! - Enforce trigger isolation: pull-request builds never write
//! - Keep publication idempotent per artifact identity
//!
//! # Design Decisions
//! - `publish` takes a [`ClearedArtifact`], which only a Pass decision can
//!   produce, so "publish only after the gate passed" holds by construction
//! - A tag already carrying the identical digest is not pushed again; one
//!   publication record per identity, ever
//! - The short-lived credential is borrowed for the call and never stored

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::artifact::Trigger;
use crate::pipeline::gate::ClearedArtifact;
use crate::registry::{ImageRegistry, RegistryError, RegistryToken};

/// Record that an artifact was pushed to the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub repository: String,

    /// Tag = revision hash.
    pub tag: String,

    /// Content digest recorded under the tag.
    pub digest: String,

    pub pushed_at: DateTime<Utc>,
}

/// Why a publish was skipped without touching the registry (beyond the
/// idempotence probe).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Pull-request trigger: external contributors' builds cannot write to
    /// the registry.
    PullRequest,

    /// The identity is already published with identical content.
    AlreadyPublished,
}

/// Outcome of a publish attempt.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    Published(PublicationRecord),
    Skipped(SkipReason),
}

/// Error type for publication.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Publisher for gated artifacts.
pub struct Publisher<'a> {
    registry: &'a dyn ImageRegistry,
    repository: &'a str,
}

impl<'a> Publisher<'a> {
    pub fn new(registry: &'a dyn ImageRegistry, repository: &'a str) -> Self {
        Self { registry, repository }
    }

    /// Publish a cleared artifact.
    ///
    /// Pull-request triggers skip without any registry write. Re-publishing
    /// the same identity yields `Skipped(AlreadyPublished)` instead of a
    /// second record.
    pub async fn publish(
        &self,
        cleared: ClearedArtifact<'_>,
        trigger: Trigger,
        token: &RegistryToken,
    ) -> Result<PublishOutcome, PublishError> {
        if trigger == Trigger::PullRequest {
            tracing::info!(
                tag = cleared.artifact().tag(),
                "Pull-request build; skipping publish"
            );
            return Ok(PublishOutcome::Skipped(SkipReason::PullRequest));
        }

        let artifact = cleared.artifact();
        let tag = artifact.tag();

        if let Some(existing) = self.registry.tag_digest(self.repository, tag).await? {
            if existing == artifact.manifest.content_digest {
                tracing::info!(tag, "Identity already published; skipping");
                return Ok(PublishOutcome::Skipped(SkipReason::AlreadyPublished));
            }
            // Divergent content under an existing tag is normally caught by
            // the builder; overwriting the same tag keeps the registry
            // converged on the gated build.
            tracing::warn!(tag, existing = %existing, "Overwriting divergent tag");
        }

        self.registry
            .push(self.repository, tag, &artifact.manifest, token)
            .await?;

        let record = PublicationRecord {
            repository: self.repository.to_string(),
            tag: tag.to_string(),
            digest: artifact.manifest.content_digest.clone(),
            pushed_at: Utc::now(),
        };

        tracing::info!(
            repository = %record.repository,
            tag = %record.tag,
            digest = %record.digest,
            "Artifact published"
        );

        Ok(PublishOutcome::Published(record))
    }
}
