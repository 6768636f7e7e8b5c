//! `HttpUpstream` against a local raw HTTP backend.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use url::Url;

use registry_proxy::config::UpstreamConfig;
use registry_proxy::http::{HttpUpstream, OutboundRequest, UpstreamClient};

mod common;

fn upstream() -> HttpUpstream {
    HttpUpstream::new(&UpstreamConfig::default()).unwrap()
}

#[tokio::test]
async fn test_forwards_headers_and_streams_response() {
    let response = "HTTP/1.1 401 Unauthorized\r\n\
        WWW-Authenticate: Bearer realm=\"https://auth.docker.io/token\"\r\n\
        Docker-Distribution-Api-Version: registry/2.0\r\n\
        Content-Length: 5\r\n\
        Connection: close\r\n\r\nhello"
        .to_string();
    let (backend_addr, mut requests) = common::start_recording_backend(response).await;

    let mut headers = HeaderMap::new();
    headers.insert(header::HOST, HeaderValue::from_static("registry-1.docker.io"));
    headers.insert(header::USER_AGENT, HeaderValue::from_static("docker/24.0.7"));
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/vnd.docker.distribution.manifest.v2+json"));

    let request = OutboundRequest {
        method: Method::GET,
        url: Url::parse(&format!("http://{}/v2/library/busybox/manifests/latest", backend_addr)).unwrap(),
        headers,
        body: None,
    };

    let res = upstream().send(request).await.expect("backend reachable");
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers[header::WWW_AUTHENTICATE], r#"Bearer realm="https://auth.docker.io/token""#);
    assert_eq!(res.headers["docker-distribution-api-version"], "registry/2.0");
    let body = axum::body::to_bytes(res.body, usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"hello");

    let raw = requests.recv().await.unwrap();
    let head = raw.to_ascii_lowercase();
    assert!(raw.starts_with("GET /v2/library/busybox/manifests/latest HTTP/1.1\r\n"), "{raw}");
    // Host comes from the URL the client actually connects to.
    assert!(head.contains(&format!("host: {}\r\n", backend_addr)), "{raw}");
    assert!(!head.contains("host: registry-1.docker.io"), "{raw}");
    assert!(head.contains("user-agent: docker/24.0.7\r\n"), "{raw}");
    assert!(head.contains("accept: application/vnd.docker.distribution.manifest.v2+json\r\n"), "{raw}");
}

#[tokio::test]
async fn test_forwards_request_body() {
    let response = "HTTP/1.1 202 Accepted\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string();
    let (backend_addr, mut requests) = common::start_recording_backend(response).await;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("11"));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));

    let request = OutboundRequest {
        method: Method::PATCH,
        url: Url::parse(&format!("http://{}/v2/org/app/blobs/uploads/u-1", backend_addr)).unwrap(),
        headers,
        body: Some(Body::from("layer-bytes")),
    };

    let res = upstream().send(request).await.unwrap();
    assert_eq!(res.status, StatusCode::ACCEPTED);

    let raw = requests.recv().await.unwrap();
    assert!(raw.starts_with("PATCH /v2/org/app/blobs/uploads/u-1 HTTP/1.1\r\n"), "{raw}");
    assert!(raw.contains("layer-bytes"), "{raw}");
}

#[tokio::test]
async fn test_connection_refused_is_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let request = OutboundRequest {
        method: Method::GET,
        url: Url::parse(&format!("http://{}/v2/", addr)).unwrap(),
        headers: HeaderMap::new(),
        body: None,
    };

    assert!(upstream().send(request).await.is_err());
}
