//! Hostname to upstream resolution.
//!
//! # Responsibilities
//! - Build the proxy hostname → registry map from the base domain
//! - Extract hostname and non-default port from an inbound request
//! - Resolve an admitted hostname to its upstream registry
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) host lookup via HashMap
//! - Host matching is case-insensitive (RFC 9110)

use std::collections::HashMap;
use std::str::FromStr;

use axum::body::Body;
use axum::http::{header, uri::Authority, Request};

use crate::routing::registry::Registry;

/// Proxy hostname → registry lookup table.
#[derive(Debug, Clone)]
pub struct DomainMap {
    base_domain: String,
    hosts: HashMap<String, Registry>,
}

impl DomainMap {
    /// Build the table for every registry under `base_domain`.
    pub fn new(base_domain: &str) -> Self {
        let base_domain = base_domain.trim_end_matches('.').to_ascii_lowercase();
        let hosts = Registry::ALL
            .iter()
            .map(|registry| (registry.proxy_host(&base_domain), *registry))
            .collect();
        Self { base_domain, hosts }
    }

    /// Operator base domain, lowercased.
    pub fn base_domain(&self) -> &str {
        &self.base_domain
    }

    /// Look up the registry served at `hostname`.
    pub fn resolve(&self, hostname: &str) -> Option<Registry> {
        self.hosts.get(&hostname.to_ascii_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Hostname and port the client addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundHost {
    /// Lowercased hostname without port.
    pub hostname: String,
    /// Port, present only when it differs from the scheme default.
    pub port: Option<u16>,
}

impl InboundHost {
    /// Read the addressed host from the `Host` header, falling back to the URI
    /// authority (HTTP/2 requests carry it there).
    pub fn from_request(req: &Request<Body>) -> Option<Self> {
        let authority = req
            .headers()
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| Authority::from_str(h).ok())
            .or_else(|| req.uri().authority().cloned())?;

        let default_port = match inbound_scheme(req) {
            "https" => 443,
            _ => 80,
        };

        Some(Self {
            hostname: authority.host().to_ascii_lowercase(),
            port: authority.port_u16().filter(|p| *p != default_port),
        })
    }

    /// `:<port>` suffix for rewritten authorities, or an empty string.
    pub fn port_suffix(&self) -> String {
        self.port.map(|p| format!(":{}", p)).unwrap_or_default()
    }
}

/// Scheme the client used, honoring a terminating proxy's `X-Forwarded-Proto`.
fn inbound_scheme(req: &Request<Body>) -> &str {
    req.headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .or_else(|| req.uri().scheme_str())
        .map(|s| if s.eq_ignore_ascii_case("https") { "https" } else { "http" })
        .unwrap_or("http")
}
