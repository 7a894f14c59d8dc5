//! Migration application sequencing.
//!
//! # Design Decisions
//! - Application is a serialized critical section: the advisory lock is
//!   acquired with a bounded timeout before any change, and a second runner
//!   gets `LockHeld` rather than ever proceeding concurrently
//! - Already-applied versions are skipped via the persisted marker, so
//!   re-running after any success is a no-op for those versions
//! - A failure names the failing version and halts; the sequence never
//!   skips ahead past a failure

use std::time::Duration;

use crate::migrate::migration::Migration;
use crate::migrate::store::{MigrationError, MigrationStore};

/// Applies pending migrations in strict version order.
pub struct MigrationRunner<'a> {
    store: &'a dyn MigrationStore,
    lock_timeout: Duration,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(store: &'a dyn MigrationStore, lock_timeout: Duration) -> Self {
        Self {
            store,
            lock_timeout,
        }
    }

    /// Apply every pending migration, returning how many were applied.
    ///
    /// A store already at the latest version returns `Ok(0)` with no side
    /// effects beyond the lock round-trip.
    pub async fn apply(&self, migrations: &[Migration]) -> Result<usize, MigrationError> {
        self.store.lock(self.lock_timeout).await?;
        let result = self.apply_locked(migrations).await;
        self.store.unlock().await;
        result
    }

    async fn apply_locked(&self, migrations: &[Migration]) -> Result<usize, MigrationError> {
        let current = self.store.current_version().await?;
        let mut applied = 0usize;

        for migration in migrations {
            if migration.version <= current {
                tracing::debug!(version = migration.version, "Already applied; skipping");
                continue;
            }

            tracing::info!(
                version = migration.version,
                name = %migration.name,
                "Applying migration"
            );
            self.store.apply(migration).await?;
            applied += 1;
        }

        tracing::info!(applied, from_version = current, "Migration run complete");
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory store with an injectable failure version.
    #[derive(Default)]
    struct MemoryStore {
        version: Mutex<u64>,
        applied: Mutex<Vec<u64>>,
        locked: AtomicBool,
        fail_at: Option<u64>,
    }

    impl MemoryStore {
        fn at_version(version: u64) -> Self {
            Self {
                version: Mutex::new(version),
                ..Default::default()
            }
        }

        fn failing_at(version: u64) -> Self {
            Self {
                fail_at: Some(version),
                ..Default::default()
            }
        }

        fn hold_lock(&self) {
            self.locked.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MigrationStore for MemoryStore {
        async fn lock(&self, _timeout: Duration) -> Result<(), MigrationError> {
            if self.locked.swap(true, Ordering::SeqCst) {
                return Err(MigrationError::LockHeld);
            }
            Ok(())
        }

        async fn unlock(&self) {
            self.locked.store(false, Ordering::SeqCst);
        }

        async fn current_version(&self) -> Result<u64, MigrationError> {
            Ok(*self.version.lock().unwrap())
        }

        async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
            if self.fail_at == Some(migration.version) {
                return Err(MigrationError::StepFailed {
                    version: migration.version,
                    reason: "injected failure".to_string(),
                });
            }
            self.applied.lock().unwrap().push(migration.version);
            *self.version.lock().unwrap() = migration.version;
            Ok(())
        }
    }

    fn migration(version: u64) -> Migration {
        Migration {
            version,
            name: format!("step_{version}"),
            sql: format!("-- migration {version}"),
        }
    }

    fn timeout() -> Duration {
        Duration::from_millis(50)
    }

    #[tokio::test]
    async fn applies_pending_in_order() {
        let store = MemoryStore::default();
        let runner = MigrationRunner::new(&store, timeout());

        let applied = runner
            .apply(&[migration(1), migration(2), migration(3)])
            .await
            .unwrap();

        assert_eq!(applied, 3);
        assert_eq!(*store.applied.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn up_to_date_store_is_a_noop() {
        let store = MemoryStore::at_version(3);
        let runner = MigrationRunner::new(&store, timeout());

        let applied = runner
            .apply(&[migration(1), migration(2), migration(3)])
            .await
            .unwrap();

        assert_eq!(applied, 0);
        assert!(store.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn resumes_after_partial_application() {
        let store = MemoryStore::at_version(1);
        let runner = MigrationRunner::new(&store, timeout());

        let applied = runner
            .apply(&[migration(1), migration(2), migration(3)])
            .await
            .unwrap();

        assert_eq!(applied, 2);
        assert_eq!(*store.applied.lock().unwrap(), vec![2, 3]);
    }

    #[tokio::test]
    async fn failure_names_the_version_and_halts() {
        let store = MemoryStore::failing_at(2);
        let runner = MigrationRunner::new(&store, timeout());

        let err = runner
            .apply(&[migration(1), migration(2), migration(3)])
            .await
            .unwrap_err();

        match err {
            MigrationError::StepFailed { version, .. } => assert_eq!(version, 2),
            other => panic!("expected StepFailed, got {other:?}"),
        }
        // V3 was never attempted; the marker stays at the last success.
        assert_eq!(*store.applied.lock().unwrap(), vec![1]);
        assert_eq!(store.current_version().await.unwrap(), 1);
        // The lock was released despite the failure.
        assert!(!store.locked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn held_lock_fails_fast() {
        let store = MemoryStore::default();
        store.hold_lock();
        let runner = MigrationRunner::new(&store, timeout());

        let err = runner.apply(&[migration(1)]).await.unwrap_err();
        assert!(matches!(err, MigrationError::LockHeld));
        assert!(store.applied.lock().unwrap().is_empty());
    }
}
