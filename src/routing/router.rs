//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Compile route configuration into matchers at startup
//! - Look up the matching route for a request
//! - Return the matched route or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks); a route
//!   change requires a restart
//! - Sorted by priority descending, then first match wins (deterministic)
//! - Explicit no-match rather than a silent default backend

use axum::body::Body;
use axum::http::uri::Authority;
use axum::http::Request;

use crate::config::RouteConfig;
use crate::routing::matcher::{HostMatcher, Matcher, PathPrefixMatcher};

/// A route compiled for matching.
#[derive(Debug)]
pub struct CompiledRoute {
    /// Route name for logging/metrics.
    pub name: String,

    /// Backend target authority (host:port).
    pub target: Authority,

    host: Option<HostMatcher>,
    path_prefix: Option<PathPrefixMatcher>,
    priority: u32,
}

impl CompiledRoute {
    fn matches(&self, req: &Request<Body>) -> bool {
        // AND semantics; absent condition = wildcard. Config validation
        // rejects routes with neither condition.
        self.host.as_ref().map_or(true, |m| m.matches(req))
            && self.path_prefix.as_ref().map_or(true, |m| m.matches(req))
    }
}

/// Error for a route whose target is not a valid authority.
#[derive(Debug, thiserror::Error)]
#[error("route '{route}' has invalid target '{target}'")]
pub struct InvalidTarget {
    pub route: String,
    pub target: String,
}

/// Immutable table of compiled routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    /// Compile the configured routes.
    pub fn compile(configs: &[RouteConfig]) -> Result<Self, InvalidTarget> {
        let mut routes = Vec::with_capacity(configs.len());
        for config in configs {
            let target: Authority =
                config.target.parse().map_err(|_| InvalidTarget {
                    route: config.name.clone(),
                    target: config.target.clone(),
                })?;
            routes.push(CompiledRoute {
                name: config.name.clone(),
                target,
                host: config.host.as_deref().map(HostMatcher::new),
                path_prefix: config.path_prefix.as_deref().map(PathPrefixMatcher::new),
                priority: config.priority,
            });
        }
        routes.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(Self { routes })
    }

    /// Find the route for a request, if any.
    pub fn match_request(&self, req: &Request<Body>) -> Option<&CompiledRoute> {
        self.routes.iter().find(|route| route.matches(req))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
