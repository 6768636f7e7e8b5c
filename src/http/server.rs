//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Keep the generated request ID internal: it is logged, never forwarded
//!   upstream or returned to the client
//! - Bind server to listener with graceful shutdown
//! - Run each request through admission → rewrite → forward → response rewrite

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::request::rewrite_target;
use crate::http::response::{rewrite_headers, AuthRewriteTable};
use crate::http::upstream::{HttpUpstream, OutboundRequest, UpstreamClient};
use crate::observability::metrics;
use crate::routing::DomainMap;
use crate::security::{AdmissionPolicy, Admitted};

/// Per-request id used for log correlation; stripped before forwarding.
const PROXY_REQUEST_ID: HeaderName = HeaderName::from_static("x-proxy-request-id");

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub domains: Arc<DomainMap>,
    pub admission: Arc<AdmissionPolicy>,
    pub upstream: Arc<dyn UpstreamClient>,
}

/// HTTP server for the registry proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server that forwards with a pooled HTTPS client.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let upstream = HttpUpstream::new(&config.upstream)?;
        Ok(Self::with_upstream(config, Arc::new(upstream)))
    }

    /// Create a server that forwards through `upstream`.
    pub fn with_upstream(config: ProxyConfig, upstream: Arc<dyn UpstreamClient>) -> Self {
        let state = AppState {
            domains: Arc::new(DomainMap::new(&config.domain)),
            admission: Arc::new(AdmissionPolicy::new(&config.admission)),
            upstream,
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(PROXY_REQUEST_ID, MakeRequestUuid))
    }

    /// Router with all layers applied, for serving through another listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            domain = %self.config.domain,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get(&PROXY_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method = request.method().clone();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        uri = %request.uri(),
        "Proxying request"
    );

    let admitted = match state.admission.admit(&request, &state.domains) {
        Ok(admitted) => admitted,
        Err(err) => {
            tracing::debug!(request_id = %request_id, error = %err, "Request rejected");
            metrics::record_rejection(err.reason());
            return err.into_response();
        }
    };
    let registry = admitted.registry;

    match forward(&state, admitted, request).await {
        Ok(response) => {
            metrics::record_request(
                method.as_str(),
                response.status().as_u16(),
                registry.subdomain(),
                start_time,
            );
            response
        }
        Err(err) => {
            tracing::error!(
                request_id = %request_id,
                registry = %registry,
                error = %err,
                "Upstream error"
            );
            metrics::record_request(method.as_str(), err.status().as_u16(), registry.subdomain(), start_time);
            err.into_response()
        }
    }
}

/// Rewrite, forward and rewrite back an admitted request.
async fn forward(
    state: &AppState,
    admitted: Admitted,
    request: Request<Body>,
) -> Result<Response, ProxyError> {
    let Admitted { registry, host } = admitted;
    let (mut parts, body) = request.into_parts();
    parts.headers.remove(&PROXY_REQUEST_ID);

    let target = rewrite_target(registry, parts.uri.path(), parts.uri.query());
    let outbound = OutboundRequest::new(registry, &target, parts.method, parts.headers, body)?;

    tracing::debug!(registry = %registry, url = %outbound.url, "Forwarding upstream");

    let upstream = state
        .upstream
        .send(outbound)
        .await
        .map_err(ProxyError::UpstreamUnreachable)?;

    let table = AuthRewriteTable::new(state.domains.base_domain(), host.port);
    let headers = rewrite_headers(&upstream.headers, &table);

    let mut response = Response::new(upstream.body);
    *response.status_mut() = upstream.status;
    *response.headers_mut() = headers;
    Ok(response)
}
