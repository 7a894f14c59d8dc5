//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use shipgate::pipeline::ImageManifest;
use shipgate::registry::{ImageRegistry, RegistryError, RegistryToken};

/// Start a mock backend on an ephemeral port that answers every request
/// with a fixed body. Returns the bound address and a hit counter.
#[allow(dead_code)]
pub async fn start_mock_backend(body: &'static str) -> (SocketAddr, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nx-backend: loans\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, hits)
}

/// Mock backend that waits before answering, for timeout scenarios.
#[allow(dead_code)]
pub async fn start_slow_backend(body: &'static str, delay: Duration) -> (SocketAddr, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, hits)
}

/// An address nothing listens on, for dead-backend scenarios.
#[allow(dead_code)]
pub async fn unreachable_addr() -> SocketAddr {
    // Bind then drop; the kernel won't reassign the port immediately.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// In-memory registry that counts probes and pushes.
#[derive(Default)]
#[allow(dead_code)]
pub struct CountingRegistry {
    tags: Mutex<HashMap<(String, String), String>>,
    pushes: AtomicU32,
    probes: AtomicU32,
}

#[allow(dead_code)]
impl CountingRegistry {
    pub fn push_count(&self) -> u32 {
        self.pushes.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn digest_of(&self, repository: &str, tag: &str) -> Option<String> {
        self.tags
            .lock()
            .unwrap()
            .get(&(repository.to_string(), tag.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ImageRegistry for CountingRegistry {
    async fn tag_digest(
        &self,
        repository: &str,
        tag: &str,
    ) -> Result<Option<String>, RegistryError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.digest_of(repository, tag))
    }

    async fn push(
        &self,
        repository: &str,
        tag: &str,
        manifest: &ImageManifest,
        _token: &RegistryToken,
    ) -> Result<(), RegistryError> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        self.tags.lock().unwrap().insert(
            (repository.to_string(), tag.to_string()),
            manifest.content_digest.clone(),
        );
        Ok(())
    }
}
