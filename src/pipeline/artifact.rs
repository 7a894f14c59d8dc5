//! Artifact identity and inter-stage value types.
//!
//! # Design Decisions
//! - Artifact identity is a pure function of the source revision, never of
//!   wall-clock time; rebuilding a revision yields the same tag
//! - Artifacts are immutable once created; a change ships as a new
//!   revision with a new identity, never as a mutation

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source-control revision a build derives from.
///
/// Validated newtype: 7–40 lowercase hex characters (abbreviated or full
/// commit hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Revision(String);

impl Revision {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Error for a string that is not a usable revision identifier.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid revision '{0}': expected 7-40 lowercase hex characters")]
pub struct InvalidRevision(String);

impl FromStr for Revision {
    type Err = InvalidRevision;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = (7..=40).contains(&s.len())
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Revision(s.to_string()))
        } else {
            Err(InvalidRevision(s.to_string()))
        }
    }
}

impl TryFrom<String> for Revision {
    type Error = InvalidRevision;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Revision> for String {
    fn from(r: Revision) -> String {
        r.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What caused a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    /// A commit landed on the main branch. The only trigger that may
    /// publish.
    PushToMain,
    /// A pull-request build. Never writes to the registry, regardless of
    /// gate outcome.
    PullRequest,
}

/// Digest, base image, and size of a finished image, as reported by the
/// build executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageManifest {
    /// Digest of the base image the build started from. Empty for images
    /// built from scratch.
    pub base_digest: String,

    /// Content digest of the finished image (sha256, hex).
    pub content_digest: String,

    /// Image size in bytes.
    pub size_bytes: u64,
}

/// An immutable, identity-tagged build output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Revision the artifact was built from. The registry tag equals this
    /// revision's string form.
    pub revision: Revision,

    /// When the build finished. Diagnostic only; identity never depends on
    /// it.
    pub built_at: DateTime<Utc>,

    /// Manifest of the produced image.
    pub manifest: ImageManifest,
}

impl Artifact {
    /// Registry tag for this artifact (= revision hash).
    pub fn tag(&self) -> &str {
        self.revision.as_str()
    }
}
