//! In-memory fakes for pipeline unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::config::BuildStepConfig;
use crate::pipeline::artifact::{Artifact, ImageManifest, Revision};
use crate::pipeline::builder::{BuildError, BuildExecutor};
use crate::pipeline::gate::{Finding, ScanResult, Severity};
use crate::pipeline::scanner::{ScanError, Scanner};
use crate::registry::{ImageRegistry, RegistryError, RegistryToken};

pub fn sample_artifact(revision: &str) -> Artifact {
    Artifact {
        revision: revision.parse().unwrap(),
        built_at: Utc::now(),
        manifest: ImageManifest {
            base_digest: "sha256:base".to_string(),
            content_digest: "sha256:aaa".to_string(),
            size_bytes: 4096,
        },
    }
}

pub fn finding(id: &str, severity: Severity) -> Finding {
    Finding {
        id: id.to_string(),
        severity,
        package: "libexample".to_string(),
    }
}

/// Build executor that records the steps it ran.
pub struct FakeExecutor {
    digest: String,
    fail_at: Option<String>,
    ran: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn succeeding(digest: &str) -> Self {
        Self {
            digest: digest.to_string(),
            fail_at: None,
            ran: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_at(step: &str) -> Self {
        Self {
            digest: String::new(),
            fail_at: Some(step.to_string()),
            ran: Mutex::new(Vec::new()),
        }
    }

    pub fn steps_run(&self) -> Vec<String> {
        self.ran.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildExecutor for FakeExecutor {
    async fn run_step(
        &self,
        step: &BuildStepConfig,
        _revision: &Revision,
    ) -> Result<(), BuildError> {
        self.ran.lock().unwrap().push(step.name.clone());
        if self.fail_at.as_deref() == Some(step.name.as_str()) {
            return Err(BuildError::StepFailed {
                step: step.name.clone(),
                detail: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    async fn finish(&self, _revision: &Revision) -> Result<ImageManifest, BuildError> {
        Ok(ImageManifest {
            base_digest: "sha256:base".to_string(),
            content_digest: self.digest.clone(),
            size_bytes: 4096,
        })
    }
}

type ScanHook = Box<dyn Fn() + Send + Sync>;

/// Scanner returning canned findings or a canned outage.
pub struct FakeScanner {
    findings: Result<Vec<Finding>, String>,
    hook: Mutex<Option<ScanHook>>,
}

impl FakeScanner {
    pub fn with_findings(findings: Vec<Finding>) -> Self {
        Self {
            findings: Ok(findings),
            hook: Mutex::new(None),
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            findings: Err(reason.to_string()),
            hook: Mutex::new(None),
        }
    }

    /// Register a callback invoked when a scan runs.
    pub fn on_scan(&self, f: impl Fn() + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(f));
    }
}

#[async_trait]
impl Scanner for FakeScanner {
    async fn scan(&self, artifact: &Artifact) -> Result<ScanResult, ScanError> {
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook();
        }
        match &self.findings {
            Ok(findings) => Ok(ScanResult {
                artifact_tag: artifact.tag().to_string(),
                findings: findings.clone(),
            }),
            Err(reason) => Err(ScanError::Unavailable(reason.clone())),
        }
    }
}

/// In-memory registry counting probes and pushes.
#[derive(Default)]
pub struct MemoryRegistry {
    tags: Mutex<HashMap<(String, String), String>>,
    pushes: AtomicUsize,
    probes: AtomicUsize,
    fail_pushes: AtomicBool,
}

impl MemoryRegistry {
    pub fn seed(&self, repository: &str, tag: &str, digest: &str) {
        self.tags
            .lock()
            .unwrap()
            .insert((repository.to_string(), tag.to_string()), digest.to_string());
    }

    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn fail_pushes(&self) {
        self.fail_pushes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageRegistry for MemoryRegistry {
    async fn tag_digest(
        &self,
        repository: &str,
        tag: &str,
    ) -> Result<Option<String>, RegistryError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tags
            .lock()
            .unwrap()
            .get(&(repository.to_string(), tag.to_string()))
            .cloned())
    }

    async fn push(
        &self,
        repository: &str,
        tag: &str,
        manifest: &ImageManifest,
        _token: &RegistryToken,
    ) -> Result<(), RegistryError> {
        if self.fail_pushes.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("injected outage".to_string()));
        }
        self.pushes.fetch_add(1, Ordering::SeqCst);
        self.tags.lock().unwrap().insert(
            (repository.to_string(), tag.to_string()),
            manifest.content_digest.clone(),
        );
        Ok(())
    }
}
