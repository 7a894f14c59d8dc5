//! HTTP registry client.
//!
//! Speaks a minimal manifests-by-tag protocol:
//! - `GET  /v2/{repository}/manifests/{tag}` → digest in the
//!   `docker-content-digest` header, 404 when the tag is absent
//! - `PUT  /v2/{repository}/manifests/{tag}` → manifest JSON, bearer auth
//!
//! Transient failures (connect errors, 5xx) are retried with bounded
//! exponential backoff; authentication rejections are not.

use std::time::Duration;

use async_trait::async_trait;

use crate::pipeline::artifact::ImageManifest;
use crate::registry::{ImageRegistry, RegistryError, RegistryToken};
use crate::resilience::backoff::calculate_backoff;

const PUSH_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 200;
const MAX_DELAY_MS: u64 = 2_000;

pub struct HttpRegistry {
    endpoint: url::Url,
    client: reqwest::Client,
}

impl HttpRegistry {
    /// Create a client for the given registry endpoint.
    pub fn new(endpoint: url::Url, request_timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;
        Ok(Self { endpoint, client })
    }

    fn manifest_url(&self, repository: &str, tag: &str) -> Result<url::Url, RegistryError> {
        self.endpoint
            .join(&format!("v2/{repository}/manifests/{tag}"))
            .map_err(|e| RegistryError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl ImageRegistry for HttpRegistry {
    async fn tag_digest(
        &self,
        repository: &str,
        tag: &str,
    ) -> Result<Option<String>, RegistryError> {
        let url = self.manifest_url(repository, tag)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RegistryError::Unavailable(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Err(RegistryError::AuthFailure)
            }
            status if status.is_success() => Ok(response
                .headers()
                .get("docker-content-digest")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())),
            status => Err(RegistryError::Unavailable(format!(
                "manifest query returned {status}"
            ))),
        }
    }

    async fn push(
        &self,
        repository: &str,
        tag: &str,
        manifest: &ImageManifest,
        token: &RegistryToken,
    ) -> Result<(), RegistryError> {
        let url = self.manifest_url(repository, tag)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .put(url.clone())
                .bearer_auth(token.expose())
                .json(manifest)
                .send()
                .await;

            let retryable = match result {
                Ok(response) => match response.status() {
                    status if status.is_success() => {
                        tracing::debug!(repository, tag, attempt, "Manifest pushed");
                        return Ok(());
                    }
                    reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                        return Err(RegistryError::AuthFailure);
                    }
                    status if status.is_server_error() => {
                        RegistryError::Unavailable(format!("push returned {status}"))
                    }
                    status => {
                        return Err(RegistryError::Unavailable(format!("push returned {status}")))
                    }
                },
                Err(e) => RegistryError::Unavailable(e.to_string()),
            };

            if attempt >= PUSH_ATTEMPTS {
                return Err(retryable);
            }

            let backoff = calculate_backoff(attempt, BASE_DELAY_MS, MAX_DELAY_MS);
            tracing::warn!(
                repository,
                tag,
                attempt,
                delay_ms = backoff.as_millis() as u64,
                error = %retryable,
                "Transient push failure, retrying"
            );
            tokio::time::sleep(backoff).await;
        }
    }
}
