//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use futures_util::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use registry_proxy::error::BoxError;
use registry_proxy::http::{OutboundRequest, UpstreamClient, UpstreamResponse};
use registry_proxy::{HttpServer, ProxyConfig, Shutdown};

/// What the proxy handed to its upstream client.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Upstream client double that records requests and replies with a canned response.
pub struct MockUpstream {
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    status: StatusCode,
    headers: Vec<(&'static str, &'static str)>,
    body: &'static str,
    fail: bool,
}

impl MockUpstream {
    pub fn replying(
        status: u16,
        headers: &[(&'static str, &'static str)],
        body: &'static str,
    ) -> Arc<Self> {
        Arc::new(Self {
            captured: Arc::new(Mutex::new(Vec::new())),
            status: StatusCode::from_u16(status).unwrap(),
            headers: headers.to_vec(),
            body,
            fail: false,
        })
    }

    pub fn ok() -> Arc<Self> {
        Self::replying(200, &[], "")
    }

    /// Every call fails as if the upstream refused the connection.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            captured: Arc::new(Mutex::new(Vec::new())),
            status: StatusCode::OK,
            headers: Vec::new(),
            body: "",
            fail: true,
        })
    }

    pub fn captured(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }

    pub fn only_request(&self) -> CapturedRequest {
        let captured = self.captured();
        assert_eq!(captured.len(), 1, "expected exactly one upstream request");
        captured.into_iter().next().unwrap()
    }
}

impl UpstreamClient for MockUpstream {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'static, Result<UpstreamResponse, BoxError>> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            headers.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_static(value),
            );
        }
        let reply = (!self.fail).then(|| UpstreamResponse {
            status: self.status,
            headers,
            body: Body::from(self.body),
        });
        Box::pin(record(self.captured.clone(), request, reply))
    }
}

async fn record(
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    request: OutboundRequest,
    reply: Option<UpstreamResponse>,
) -> Result<UpstreamResponse, BoxError> {
    let body = match request.body {
        Some(body) => Some(axum::body::to_bytes(body, usize::MAX).await?),
        None => None,
    };
    captured.lock().unwrap().push(CapturedRequest {
        method: request.method,
        url: request.url.to_string(),
        headers: request.headers,
        body,
    });
    reply.ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused").into()
    })
}

/// Start the proxy for `domain` on an ephemeral port.
pub async fn start_proxy(domain: &str, upstream: Arc<MockUpstream>) -> (SocketAddr, Shutdown) {
    let server = HttpServer::with_upstream(ProxyConfig::for_domain(domain), upstream);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Client that never pools, so each test request is independent.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Start a raw HTTP/1.1 backend that answers every connection with `response`
/// and reports each raw request it read.
pub async fn start_recording_backend(
    response: String,
) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            let response = response.clone();
            tokio::spawn(async move {
                let raw = read_request(&mut socket).await;
                let _ = tx.send(raw);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// Read one request: head plus a content-length or chunked body.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(head_end) = text.find("\r\n\r\n") {
            let head = text[..head_end].to_ascii_lowercase();
            let body_len = buf.len() - (head_end + 4);
            let content_length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());

            let complete = match content_length {
                Some(len) => body_len >= len,
                None if head.contains("transfer-encoding: chunked") => text.ends_with("0\r\n\r\n"),
                None => true,
            };
            if complete {
                return text;
            }
        }

        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).to_string(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}
