//! TLS material loading for the edge listener.
//!
//! Certificate or key problems are fatal at startup: the terminator never
//! comes up degraded, and plaintext on the secure port is rejected by the
//! rustls handshake rather than silently downgraded.

use std::io::BufReader;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

/// Error type for TLS material loading.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("TLS file not found: {0}")]
    Missing(String),

    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} contains no usable {kind}")]
    InvalidPem { path: String, kind: &'static str },

    #[error("failed to build TLS config: {0}")]
    Build(std::io::Error),
}

/// Load and validate a certificate/key pair.
///
/// The PEM contents are parsed eagerly so a bad pair fails the process at
/// startup instead of at the first handshake.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig, TlsError> {
    validate_pem(cert_path, PemKind::Certificate)?;
    validate_pem(key_path, PemKind::PrivateKey)?;

    RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(TlsError::Build)
}

enum PemKind {
    Certificate,
    PrivateKey,
}

fn validate_pem(path: &Path, kind: PemKind) -> Result<(), TlsError> {
    if !path.exists() {
        return Err(TlsError::Missing(path.display().to_string()));
    }

    let file = std::fs::File::open(path).map_err(|source| TlsError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let usable = match kind {
        PemKind::Certificate => rustls_pemfile::certs(&mut reader).any(|c| c.is_ok()),
        PemKind::PrivateKey => matches!(
            rustls_pemfile::private_key(&mut reader),
            Ok(Some(_))
        ),
    };

    if usable {
        Ok(())
    } else {
        Err(TlsError::InvalidPem {
            path: path.display().to_string(),
            kind: match kind {
                PemKind::Certificate => "certificate",
                PemKind::PrivateKey => "private key",
            },
        })
    }
}
