//! Admission filter.
//!
//! Rejects requests from unrecognized clients, for hosts the proxy does not
//! serve, and for paths outside the registry APIs. Checks run client →
//! domain → path and stop at the first failure; the verdict does not depend
//! on the order.

use axum::body::Body;
use axum::http::{header, Request};

use crate::config::AdmissionConfig;
use crate::error::ProxyError;
use crate::routing::matcher::{Matcher, PathPrefixMatcher, UserAgentMatcher};
use crate::routing::{DomainMap, InboundHost, Registry};

/// A request that passed admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    pub registry: Registry,
    pub host: InboundHost,
}

/// Client and path allowlists.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    clients: UserAgentMatcher,
    paths: PathPrefixMatcher,
}

impl AdmissionPolicy {
    pub fn new(config: &AdmissionConfig) -> Self {
        Self {
            clients: UserAgentMatcher::new(config.allowed_clients.iter().cloned()),
            paths: PathPrefixMatcher::new(config.allowed_paths.iter().cloned()),
        }
    }

    /// Admit `req` or say why not.
    pub fn admit(&self, req: &Request<Body>, domains: &DomainMap) -> Result<Admitted, ProxyError> {
        if !self.clients.matches(req) {
            return Err(ProxyError::ClientNotAllowed {
                user_agent: req
                    .headers()
                    .get(header::USER_AGENT)
                    .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned()),
            });
        }

        let host = InboundHost::from_request(req);
        let registry = host.as_ref().and_then(|h| domains.resolve(&h.hostname));
        let (registry, host) = match (registry, host) {
            (Some(registry), Some(host)) => (registry, host),
            (_, host) => {
                return Err(ProxyError::UnknownDomain {
                    host: host.map(|h| h.hostname),
                })
            }
        };

        if !self.paths.matches(req) {
            return Err(ProxyError::PathNotAllowed {
                path: req.uri().path().to_string(),
            });
        }

        Ok(Admitted { registry, host })
    }
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::new(&AdmissionConfig::default())
    }
}
