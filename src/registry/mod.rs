//! Container registry interface.
//!
//! # Design Decisions
//! - The registry is an externally owned shared resource, reached only
//!   through narrow, idempotent, per-tag operations — no in-process shared
//!   mutable registry state
//! - Authentication uses a short-lived token supplied per call; it is never
//!   persisted and its `Debug` output is redacted

use std::fmt;

use async_trait::async_trait;

use crate::pipeline::artifact::ImageManifest;

pub mod http;

pub use http::HttpRegistry;

/// Error type for registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry rejected the supplied credential. Not retried.
    #[error("registry authentication rejected")]
    AuthFailure,

    /// The registry could not be reached or answered with a server error.
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Short-lived push credential injected by the invoking environment.
#[derive(Clone)]
pub struct RegistryToken(String);

impl RegistryToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Read the token from the configured variable.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var).ok().filter(|t| !t.is_empty()).map(Self)
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RegistryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RegistryToken(***)")
    }
}

/// Narrow interface to an image registry.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Content digest currently recorded under `tag`, if any.
    async fn tag_digest(&self, repository: &str, tag: &str)
        -> Result<Option<String>, RegistryError>;

    /// Push a manifest under `tag`. Pushing the same tag again overwrites
    /// it; tags are unique per revision, so distinct revisions never
    /// contend.
    async fn push(
        &self,
        repository: &str,
        tag: &str,
        manifest: &ImageManifest,
        token: &RegistryToken,
    ) -> Result<(), RegistryError>;
}
