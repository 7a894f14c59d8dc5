//! Migration target store seam.
//!
//! The database itself is externally owned; the runner reaches it only
//! through this narrow interface. [`JournalStore`] is the shipped
//! implementation: it feeds each migration's SQL to a configured external
//! command and keeps the applied-version marker in a local journal,
//! replaced atomically so the marker always names the last fully-applied
//! version.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::DatabaseConfig;
use crate::migrate::migration::Migration;

/// Error type for migration application.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// A specific migration failed; the sequence halts at this version.
    #[error("migration V{version} failed: {reason}")]
    StepFailed { version: u64, reason: String },

    /// Another runner holds the advisory lock. Never proceed concurrently.
    #[error("migration lock held by another runner")]
    LockHeld,

    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("migration file name '{0}' does not match V{{version}}__{{name}}.sql")]
    InvalidFileName(String),

    #[error("duplicate migration version {0}")]
    DuplicateVersion(u64),
}

/// Narrow interface to the store migrations run against.
#[async_trait]
pub trait MigrationStore: Send + Sync {
    /// Acquire the advisory lock, waiting at most `timeout`.
    async fn lock(&self, timeout: Duration) -> Result<(), MigrationError>;

    /// Release the advisory lock.
    async fn unlock(&self);

    /// The last fully-applied version (0 when none).
    async fn current_version(&self) -> Result<u64, MigrationError>;

    /// Apply one migration and record its version as a unit: after a
    /// successful return the marker equals `migration.version`, after an
    /// error it is unchanged.
    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Journal {
    version: u64,
}

/// File-journal store driving an external apply command.
pub struct JournalStore {
    apply_command: Vec<String>,
    database_url: String,
    journal_path: PathBuf,
    lock_path: PathBuf,
    step_timeout: Duration,
}

impl JournalStore {
    pub fn new(config: &DatabaseConfig) -> Self {
        let state_dir = PathBuf::from(&config.state_dir);
        Self {
            apply_command: config.apply_command.clone(),
            database_url: config.url.clone(),
            journal_path: state_dir.join("migration-journal.json"),
            lock_path: state_dir.join("migration.lock"),
            step_timeout: Duration::from_secs(600),
        }
    }

    fn read_journal(&self) -> Result<Journal, MigrationError> {
        match std::fs::read(&self.journal_path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| MigrationError::Io {
                path: self.journal_path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Journal::default()),
            Err(source) => Err(MigrationError::Io {
                path: self.journal_path.display().to_string(),
                source,
            }),
        }
    }

    fn write_journal(&self, journal: &Journal) -> Result<(), MigrationError> {
        let io_err = |source| MigrationError::Io {
            path: self.journal_path.display().to_string(),
            source,
        };

        if let Some(parent) = self.journal_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        // Write-then-rename keeps the marker at the last fully-applied
        // version even if the process dies mid-write.
        let tmp = self.journal_path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(journal)
            .map_err(|e| io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        std::fs::write(&tmp, bytes).map_err(io_err)?;
        std::fs::rename(&tmp, &self.journal_path).map_err(io_err)?;
        Ok(())
    }

    async fn run_apply_command(&self, migration: &Migration) -> Result<(), MigrationError> {
        let step_failed = |reason: String| MigrationError::StepFailed {
            version: migration.version,
            reason,
        };

        let exe = self
            .apply_command
            .first()
            .ok_or_else(|| step_failed("no apply command configured".to_string()))?;

        let mut child = Command::new(exe)
            .args(&self.apply_command[1..])
            .arg(&self.database_url)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| step_failed(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(migration.sql.as_bytes())
                .await
                .map_err(|e| step_failed(e.to_string()))?;
        }

        let output = tokio::time::timeout(self.step_timeout, child.wait_with_output())
            .await
            .map_err(|_| step_failed(format!("timed out after {:?}", self.step_timeout)))?
            .map_err(|e| step_failed(e.to_string()))?;

        if output.status.success() {
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
}

#[async_trait]
impl MigrationStore for JournalStore {
    async fn lock(&self, timeout: Duration) -> Result<(), MigrationError> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| MigrationError::Io {
                path: self.lock_path.display().to_string(),
                source,
            })?;
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // create_new is the atomicity guarantee: exactly one runner
            // creates the lock file.
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.lock_path)
            {
                Ok(mut file) => {
                    use std::io::Write;
                    let _ = write!(file, "{}", std::process::id());
                    return Ok(());
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(MigrationError::LockHeld);
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Err(source) => {
                    return Err(MigrationError::Io {
                        path: self.lock_path.display().to_string(),
                        source,
                    });
                }
            }
        }
    }

    async fn unlock(&self) {
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            tracing::warn!(path = %self.lock_path.display(), error = %e, "Failed to remove lock file");
        }
    }

    async fn current_version(&self) -> Result<u64, MigrationError> {
        Ok(self.read_journal()?.version)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        self.run_apply_command(migration).await?;
        self.write_journal(&Journal {
            version: migration.version,
        })
    }
}
