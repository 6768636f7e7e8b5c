//! Outbound forwarding.
//!
//! # Responsibilities
//! - Build the upstream request (`https://<upstream><path>[?query]`, Host rewritten)
//! - Hand it to an [`UpstreamClient`] and return the streamed response
//!
//! # Design Decisions
//! - Exactly one outbound call per inbound request, no retries
//! - Bodies are streamed in both directions, never buffered
//! - Dropping the returned future aborts the upstream call, so a client
//!   disconnect cancels the outbound request
//! - Outbound is always the default HTTPS port; the inbound port only
//!   affects rewritten authorities in responses

use std::time::Duration;

use axum::body::{Body, HttpBody};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use futures_util::future::BoxFuture;
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::{BoxError, ProxyError};
use crate::http::request::RewrittenTarget;
use crate::routing::Registry;

/// Request to be sent to an upstream registry.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// `None` when the inbound request carried no body.
    pub body: Option<Body>,
}

impl OutboundRequest {
    /// Build the outbound request for an admitted, rewritten inbound request.
    ///
    /// All inbound headers are kept except `Host`, which names the upstream.
    pub fn new(
        registry: Registry,
        target: &RewrittenTarget,
        method: Method,
        mut headers: HeaderMap,
        body: Body,
    ) -> Result<Self, ProxyError> {
        let upstream = registry.upstream();
        let mut url = Url::parse(&format!("https://{}{}", upstream, target.path))?;
        url.set_query(target.query.as_deref());

        headers.insert(header::HOST, HeaderValue::from_static(upstream));

        let body = if body.is_end_stream() { None } else { Some(body) };

        Ok(Self {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Response received from an upstream registry.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

/// Outbound HTTP collaborator.
pub trait UpstreamClient: Send + Sync {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'static, Result<UpstreamResponse, BoxError>>;
}

/// [`UpstreamClient`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        let redirect = if config.max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(config.max_redirects)
        };

        let mut builder = reqwest::Client::builder()
            .redirect(redirect)
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs));
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl UpstreamClient for HttpUpstream {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'static, Result<UpstreamResponse, BoxError>> {
        Box::pin(execute(self.client.clone(), request))
    }
}

async fn execute(client: reqwest::Client, request: OutboundRequest) -> Result<UpstreamResponse, BoxError> {
    let OutboundRequest {
        method,
        url,
        mut headers,
        body,
    } = request;

    // The client derives Host from each hop's URL; an explicit header would
    // leak into redirects to blob storage hosts.
    headers.remove(header::HOST);

    let mut builder = client.request(method, url).headers(headers);
    if let Some(body) = body {
        builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let response = builder.send().await?;

    Ok(UpstreamResponse {
        status: response.status(),
        headers: response.headers().clone(),
        body: Body::from_stream(response.bytes_stream()),
    })
}
