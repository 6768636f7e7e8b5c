//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → admission.rs (user-agent allowlist, served domain, path allowlist)
//!     → Pass to rewriting / forwarding
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any admission check failure
//! - Rejections carry detail for logs only; clients see a generic 400

pub mod admission;

pub use admission::{AdmissionPolicy, Admitted};
