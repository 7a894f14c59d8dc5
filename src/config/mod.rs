//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! SHIPGATE_ENV (dev | staging | prod, default dev)
//!     → schema.rs (Environment)
//!     → loader.rs (read <dir>/<env>.toml, deserialize)
//!     → validation.rs (required keys + semantic checks, all errors)
//!     → ShipConfig (validated, immutable)
//!     → passed by value/reference to every subsystem
//! ```
//!
//! # Design Decisions
//! - Resolution is all-or-nothing; no component runs with a partial set
//! - Config is immutable once resolved; changes require a restart
//! - Sections have defaults so minimal files only name required keys
//! - Secrets (database credentials, registry tokens) are never logged

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{resolve, ConfigError};
pub use schema::{
    BuildStepConfig, DatabaseConfig, Environment, ListenerConfig, ObservabilityConfig,
    PipelineConfig, RegistryConfig, RouteConfig, ShipConfig, TimeoutConfig, TlsConfig,
};
pub use validation::ValidationError;
