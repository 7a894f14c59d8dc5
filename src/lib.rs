//! shipgate — release controller and TLS edge terminator.
//!
//! Two independent halves share one configuration model:
//!
//! ```text
//!  CI path (shipgate-ctl run):
//!      Revision ──▶ config ──▶ pipeline::builder ──▶ pipeline::scanner
//!                                                        │
//!                                   registry ◀── pipeline::publisher ◀── pipeline::gate
//!
//!  Deploy path:
//!      config ──▶ migrate (operator-invoked) ──▶ backend comes up
//!      config ──▶ net (TLS) ──▶ http (edge server) ──▶ routing ──▶ backend
//! ```
//!
//! The pipeline turns a source revision into an immutable, content-addressed,
//! vulnerability-gated artifact and pushes it to the registry; the edge
//! terminates TLS and routes requests to the backend, with `/health` served
//! by the edge itself.

// Control plane
pub mod config;
pub mod migrate;
pub mod pipeline;
pub mod registry;

// Data plane
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::{Environment, ShipConfig};
pub use http::EdgeServer;
pub use lifecycle::Shutdown;
