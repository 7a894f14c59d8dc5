//! HTTP edge subsystem.
//!
//! # Data Flow
//! ```text
//! TLS-terminated connection
//!     → server.rs (axum app: /health, fallback proxy handler)
//!     → routing table lookup (404 on no match, no backend contact)
//!     → forward over plain HTTP to the route target
//!     → stream response back verbatim (hop-by-hop headers stripped)
//! ```

pub mod server;

pub use server::{AppState, EdgeServer, ProxyError};
