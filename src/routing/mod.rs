//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (host, path)
//!     → router.rs (table lookup, priority order)
//!     → matcher.rs (host exact/case-insensitive, path prefix, AND)
//!     → matched CompiledRoute or explicit no-match
//!
//! Route compilation (at startup):
//!     RouteConfig[]
//!     → validate targets as authorities
//!     → sort by priority
//!     → freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime; reload = restart
//! - No regex in the hot path (prefix matching only)
//! - First match wins (ordered by priority)

pub mod matcher;
pub mod router;

pub use matcher::{HostMatcher, Matcher, PathPrefixMatcher};
pub use router::{CompiledRoute, InvalidTarget, RouteTable};
