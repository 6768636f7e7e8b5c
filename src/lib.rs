//! Container registry reverse proxy.
//!
//! Serves `<registry>.<domain>` hosts for Docker Hub, Quay, GCR, GHCR,
//! registry.k8s.io, NVCR, Cloudsmith and ECR Public, rewriting paths,
//! token scopes and auth challenges so clients stay on the proxy's domain.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::Registry;
