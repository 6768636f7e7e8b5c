//! Response handling and transformation.
//!
//! # Responsibilities
//! - Point `WWW-Authenticate` realms back at the proxy's own hosts
//! - Qualify unnamespaced repository scopes in those challenges
//! - Copy every other upstream header through untouched
//!
//! # Design Decisions
//! - Realm hosts are replaced only on an exact authority match
//! - A challenge that names none of the proxied authorities is dropped
//! - Rewriting never fails and works on raw header bytes, so values carrying
//!   non-ASCII text are rewritten like any other

use axum::http::{header, HeaderMap, HeaderValue};
use once_cell::sync::Lazy;
use regex::bytes::{Captures, Regex};

use crate::routing::Registry;

static REALM_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?-u)(realm="https://)([^/"]+)(/)"#).expect("static regex"));

static UNQUALIFIED_PULL_SCOPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?-u)scope=("?)repository:([^:/"]+):pull"#).expect("static regex"));

/// Upstream realm authority → proxy authority, for one request.
#[derive(Debug, Clone)]
pub struct AuthRewriteTable {
    entries: Vec<(&'static str, String)>,
}

impl AuthRewriteTable {
    /// Build the table for `base_domain`, suffixing every proxy authority with
    /// the inbound port when it is not the scheme default.
    pub fn new(base_domain: &str, port: Option<u16>) -> Self {
        let suffix = port.map(|p| format!(":{}", p)).unwrap_or_default();
        let entries = Registry::ALL
            .iter()
            .filter(|r| r.serves_realm())
            .map(|r| (r.upstream(), format!("{}{}", r.proxy_host(base_domain), suffix)))
            .collect();
        Self { entries }
    }

    /// Proxy authority standing in for `upstream`.
    pub fn lookup(&self, upstream: &[u8]) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.as_bytes() == upstream)
            .map(|(_, proxy)| proxy.as_str())
    }

    /// Whether `value` mentions any upstream authority in the table.
    pub fn is_referenced_by(&self, value: &[u8]) -> bool {
        self.entries
            .iter()
            .any(|(key, _)| value.windows(key.len()).any(|w| w == key.as_bytes()))
    }
}

/// Rewrite one `WWW-Authenticate` value; `None` means drop the header.
pub fn rewrite_challenge(value: &[u8], table: &AuthRewriteTable) -> Option<Vec<u8>> {
    if !table.is_referenced_by(value) {
        return None;
    }

    let realm = REALM_HOST.replace(value, |caps: &Captures| match table.lookup(&caps[2]) {
        Some(proxy) => [&caps[1], proxy.as_bytes(), &caps[3]].concat(),
        None => caps[0].to_vec(),
    });

    let scoped = UNQUALIFIED_PULL_SCOPE
        .replace(&realm, &b"scope=${1}repository:library/${2}:pull"[..])
        .into_owned();

    Some(scoped)
}

/// Copy upstream headers, rewriting or dropping `WWW-Authenticate` values.
pub fn rewrite_headers(upstream: &HeaderMap, table: &AuthRewriteTable) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());

    for (name, value) in upstream {
        if name != header::WWW_AUTHENTICATE {
            headers.append(name.clone(), value.clone());
            continue;
        }

        let rewritten = rewrite_challenge(value.as_bytes(), table)
            .and_then(|v| HeaderValue::from_bytes(&v).ok());

        match rewritten {
            Some(new_value) => {
                tracing::debug!(from = ?value, to = ?new_value, "Rewrote auth challenge");
                headers.append(header::WWW_AUTHENTICATE, new_value);
            }
            None => {
                tracing::debug!(value = ?value, "Dropped auth challenge for unknown authority");
            }
        }
    }

    headers
}
