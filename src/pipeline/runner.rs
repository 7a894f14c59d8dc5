//! Pipeline orchestration: Build → Scan → Gate → Publish.
//!
//! # Design Decisions
//! - Stages are named and pass typed values (Artifact, ScanResult,
//!   GateDecision, PublicationRecord), so each contract is testable without
//!   running the whole chain
//! - Strictly sequential per revision; distinct revisions may run
//!   concurrently with the registry as the only shared resource
//! - Cancellation is observed between stages only: a superseded run stops
//!   before the publish write, never after a record exists
//! - A blocked gate is an expected terminal outcome, reported visibly; it
//!   is not an error

use tokio::sync::watch;
use uuid::Uuid;

use crate::pipeline::artifact::{Revision, Trigger};
use crate::pipeline::builder::{ArtifactBuilder, BuildError};
use crate::pipeline::gate::{decide, Finding, GateDecision};
use crate::pipeline::publisher::{PublishError, PublishOutcome, Publisher, SkipReason};
use crate::pipeline::scanner::{ScanError, Scanner};
use crate::registry::{ImageRegistry, RegistryToken};

/// Named pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Scan,
    Gate,
    Publish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Build => "build",
            Stage::Scan => "scan",
            Stage::Gate => "gate",
            Stage::Publish => "publish",
        }
    }
}

/// Terminal outcome of a pipeline run.
#[derive(Debug)]
pub enum RunOutcome {
    /// Gate passed and the artifact was pushed.
    Published(crate::pipeline::publisher::PublicationRecord),

    /// Gate passed but publication was skipped (pull-request trigger or
    /// already-published identity).
    SkippedPublish(SkipReason),

    /// Gate blocked on critical findings. Expected, terminal, visible.
    Blocked { critical: Vec<Finding> },

    /// The run was cancelled before the named stage started.
    Cancelled { before: Stage },
}

/// Error type for a failed run. Failures abort this revision's run only.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// One-flow-per-revision pipeline runner.
pub struct PipelineRunner<'a> {
    builder: ArtifactBuilder<'a>,
    scanner: &'a dyn Scanner,
    registry: &'a dyn ImageRegistry,
    repository: &'a str,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(
        builder: ArtifactBuilder<'a>,
        scanner: &'a dyn Scanner,
        registry: &'a dyn ImageRegistry,
        repository: &'a str,
    ) -> Self {
        Self {
            builder,
            scanner,
            registry,
            repository,
        }
    }

    /// Run the pipeline for one revision.
    ///
    /// `cancel` carries `true` once the run is superseded; it is checked
    /// before each stage.
    pub async fn run(
        &self,
        revision: &Revision,
        trigger: Trigger,
        token: &RegistryToken,
        cancel: &watch::Receiver<bool>,
    ) -> Result<RunOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        tracing::info!(
            run_id = %run_id,
            revision = %revision,
            trigger = ?trigger,
            "Pipeline run starting"
        );

        if let Some(outcome) = cancelled_before(Stage::Build, cancel, run_id) {
            return Ok(outcome);
        }
        let artifact = self
            .builder
            .build(revision, self.registry, self.repository)
            .await?;
        crate::observability::metrics::record_stage(Stage::Build.as_str(), "ok");

        if let Some(outcome) = cancelled_before(Stage::Scan, cancel, run_id) {
            return Ok(outcome);
        }
        let scan = self.scanner.scan(&artifact).await.map_err(|e| {
            crate::observability::metrics::record_stage(Stage::Scan.as_str(), "error");
            e
        })?;
        crate::observability::metrics::record_stage(Stage::Scan.as_str(), "ok");

        let decision = decide(&scan);
        let cleared = match &decision {
            GateDecision::Block { critical } => {
                crate::observability::metrics::record_stage(Stage::Gate.as_str(), "blocked");
                tracing::warn!(
                    run_id = %run_id,
                    revision = %revision,
                    critical = critical.len(),
                    findings = ?critical.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(),
                    "Gate blocked promotion"
                );
                return Ok(RunOutcome::Blocked {
                    critical: critical.clone(),
                });
            }
            GateDecision::Pass => {
                crate::observability::metrics::record_stage(Stage::Gate.as_str(), "pass");
                decision
                    .clear(&artifact)
                    .expect("pass decision always clears")
            }
        };

        if let Some(outcome) = cancelled_before(Stage::Publish, cancel, run_id) {
            return Ok(outcome);
        }
        let publisher = Publisher::new(self.registry, self.repository);
        let outcome = match publisher.publish(cleared, trigger, token).await? {
            PublishOutcome::Published(record) => {
                crate::observability::metrics::record_stage(Stage::Publish.as_str(), "ok");
                RunOutcome::Published(record)
            }
            PublishOutcome::Skipped(reason) => {
                crate::observability::metrics::record_stage(Stage::Publish.as_str(), "skipped");
                RunOutcome::SkippedPublish(reason)
            }
        };

        tracing::info!(run_id = %run_id, revision = %revision, outcome = ?outcome, "Pipeline run finished");
        Ok(outcome)
    }
}

fn cancelled_before(
    stage: Stage,
    cancel: &watch::Receiver<bool>,
    run_id: Uuid,
) -> Option<RunOutcome> {
    if *cancel.borrow() {
        tracing::info!(run_id = %run_id, stage = stage.as_str(), "Run cancelled");
        Some(RunOutcome::Cancelled { before: stage })
    } else {
        None
    }
}
