//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the fixed required-key list (database URL, registry endpoint)
//! - Validate value shapes (URLs parse, targets are host:port, TLS paths set)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ShipConfig → Result<(), Vec<ValidationError>>
//! - Runs before a configuration set is handed to any component

use crate::config::schema::ShipConfig;

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A key on the required list is absent or empty.
    #[error("missing required key: {0}")]
    MissingKey(&'static str),

    /// A key is present but its value does not parse.
    #[error("malformed value for {key}: {reason}")]
    Malformed { key: &'static str, reason: String },
}

/// Validate a configuration set, collecting every error.
pub fn validate_config(config: &ShipConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.database.url.is_empty() {
        errors.push(ValidationError::MissingKey("database.url"));
    } else if let Err(e) = url::Url::parse(&config.database.url) {
        errors.push(ValidationError::Malformed {
            key: "database.url",
            reason: e.to_string(),
        });
    }

    if config.registry.endpoint.is_empty() {
        errors.push(ValidationError::MissingKey("registry.endpoint"));
    } else if let Err(e) = url::Url::parse(&config.registry.endpoint) {
        errors.push(ValidationError::Malformed {
            key: "registry.endpoint",
            reason: e.to_string(),
        });
    }

    if config.registry.repository.is_empty() {
        errors.push(ValidationError::MissingKey("registry.repository"));
    }

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::Malformed {
            key: "listener.bind_address",
            reason: format!("'{}' is not a socket address", config.listener.bind_address),
        });
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() {
            errors.push(ValidationError::MissingKey("listener.tls.cert_path"));
        }
        if tls.key_path.is_empty() {
            errors.push(ValidationError::MissingKey("listener.tls.key_path"));
        }
    }

    for route in &config.routes {
        if route.target.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::Malformed {
                key: "routes.target",
                reason: format!("route '{}': '{}' is not a socket address", route.name, route.target),
            });
        }
        if route.host.is_none() && route.path_prefix.is_none() {
            errors.push(ValidationError::Malformed {
                key: "routes",
                reason: format!("route '{}' matches neither host nor path", route.name),
            });
        }
    }

    for step in &config.pipeline.build_steps {
        if step.command.is_empty() {
            errors.push(ValidationError::Malformed {
                key: "pipeline.build_steps",
                reason: format!("step '{}' has an empty command", step.name),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
