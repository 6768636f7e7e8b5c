//! Request matching logic.
//!
//! # Responsibilities
//! - Match the client `User-Agent` against allowed substrings
//! - Match the request path against allowed prefixes
//!
//! # Design Decisions
//! - User-Agent matching is case-insensitive and substring-based
//! - Path matching is case-sensitive
//! - Any single entry matching is enough (OR semantics within a matcher)
//! - No regex to guarantee O(n) matching

use axum::body::Body;
use axum::http::{header, Request};

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request<Body>) -> bool;
}

/// Matches when the `User-Agent` contains one of the allowed client tokens.
#[derive(Debug, Clone)]
pub struct UserAgentMatcher {
    clients: Vec<String>,
}

impl UserAgentMatcher {
    /// Create a new user-agent matcher.
    /// Tokens are normalized to lowercase for case-insensitive matching.
    pub fn new<I, S>(clients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            clients: clients.into_iter().map(|c| c.into().to_lowercase()).collect(),
        }
    }

    /// Check a raw user-agent string.
    pub fn allows(&self, user_agent: &str) -> bool {
        let user_agent = user_agent.to_lowercase();
        self.clients.iter().any(|c| user_agent.contains(c.as_str()))
    }
}

impl Matcher for UserAgentMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        req.headers()
            .get(header::USER_AGENT)
            .map(|h| self.allows(&String::from_utf8_lossy(h.as_bytes())))
            .unwrap_or(false)
    }
}

/// Matches when the request path starts with one of the allowed prefixes.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefixes: Vec<String>,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, path: &str) -> bool {
        self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.allows(req.uri().path())
    }
}
