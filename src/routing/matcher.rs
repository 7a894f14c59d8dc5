//! Route matching conditions.
//!
//! # Responsibilities
//! - Match host header (exact, case-insensitive)
//! - Match path prefix (case-sensitive)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Host matching is case-insensitive (per HTTP spec)
//! - Path matching is case-sensitive
//! - An absent condition always matches (wildcard)
//! - No regex, so matching stays O(routes)

use axum::body::Body;
use axum::http::Request;

/// Trait for matching requests against a condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    fn matches(&self, req: &Request<Body>) -> bool;
}

/// Matches the Host header, ignoring any port suffix.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected: String,
}

impl HostMatcher {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        req.headers()
            .get(axum::http::header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(|h| {
                let host = h.split(':').next().unwrap_or(h);
                host.eq_ignore_ascii_case(&self.expected)
            })
            .unwrap_or(false)
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        req.uri().path().starts_with(&self.prefix)
    }
}
