//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → tls.rs (terminate TLS with the configured pair)
//!     → hand off to the HTTP layer
//!
//! Connection states:
//!     Listening → TLSHandshake → Routing → Proxying → Closed
//!     TLSHandshake → Rejected (bad negotiation, plaintext on secure port)
//!     Routing → NotFound (no route matches)
//! ```
//!
//! # Design Decisions
//! - TLS material is validated at startup; failure to load is fatal
//! - Non-TLS traffic on the secure port fails the handshake, never
//!   downgrades to plaintext

pub mod tls;

pub use tls::{load_tls_config, TlsError};
