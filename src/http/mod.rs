//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → security::admission (client, domain, path)
//!     → request.rs (Docker Hub namespace rewrites)
//!     → upstream.rs (outbound request, Host rewritten, streamed body)
//!     → response.rs (WWW-Authenticate rewrite, header copy)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use server::{AppState, HttpServer};
pub use upstream::{HttpUpstream, OutboundRequest, UpstreamClient, UpstreamResponse};
