//! Configuration resolution from disk.
//!
//! The resolver locates the TOML file for the selected environment, parses
//! it, and validates it as a unit. A set that fails any check is never
//! handed back — components see either a fully valid configuration or an
//! error before they start.

use std::path::Path;

use crate::config::schema::{Environment, ShipConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration resolution.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve the configuration set for an environment.
///
/// Reads `<dir>/<environment>.toml`. No network calls; secrets in the file
/// are never logged by the resolver.
pub fn resolve(environment: Environment, dir: &Path) -> Result<ShipConfig, ConfigError> {
    let path = dir.join(format!("{environment}.toml"));
    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: ShipConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    tracing::debug!(
        environment = %environment,
        routes = config.routes.len(),
        build_steps = config.pipeline.build_steps.len(),
        "Configuration resolved"
    );

    Ok(config)
}
