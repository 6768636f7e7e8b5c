//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, headers)
//!     → router.rs (inbound host → registry lookup)
//!     → matcher.rs (user-agent / path allowlists)
//!     → Return: Registry or no match
//!
//! Table construction (at startup):
//!     base domain
//!     → registry.rs (fixed subdomain / upstream rows)
//!     → DomainMap (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Tables built at startup, immutable at runtime
//! - No fallback upstream: unknown hosts are rejected
//! - Deterministic: same host always resolves to the same registry

pub mod matcher;
pub mod registry;
pub mod router;

pub use registry::Registry;
pub use router::{DomainMap, InboundHost};
