//! Proxy error taxonomy and its mapping to client responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Boxed error returned by upstream clients.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every way a proxied request can fail.
///
/// Variant details are for logs only; clients receive a generic body.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("client not allowed: {user_agent:?}")]
    ClientNotAllowed { user_agent: Option<String> },

    #[error("unknown domain: {host:?}")]
    UnknownDomain { host: Option<String> },

    #[error("path not allowed: {path}")]
    PathNotAllowed { path: String },

    #[error("invalid upstream url: {0}")]
    InvalidUpstreamUrl(#[from] url::ParseError),

    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(#[source] BoxError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::ClientNotAllowed { .. }
            | ProxyError::UnknownDomain { .. }
            | ProxyError::PathNotAllowed { .. } => StatusCode::BAD_REQUEST,
            ProxyError::InvalidUpstreamUrl(_) | ProxyError::UpstreamUnreachable(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ProxyError::ClientNotAllowed { .. } => "client_not_allowed",
            ProxyError::UnknownDomain { .. } => "unknown_domain",
            ProxyError::PathNotAllowed { .. } => "path_not_allowed",
            ProxyError::InvalidUpstreamUrl(_) => "invalid_upstream_url",
            ProxyError::UpstreamUnreachable(_) => "upstream_unreachable",
        }
    }

    pub fn is_admission(&self) -> bool {
        self.status() == StatusCode::BAD_REQUEST
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = match self.status() {
            StatusCode::BAD_REQUEST => "Bad request",
            _ => "Bad gateway",
        };
        (self.status(), body).into_response()
    }
}
