//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the base domain is a bare hostname proxy hosts can hang off
//! - Validate addresses and allowlists
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("base domain is not set")]
    MissingDomain,

    #[error("invalid base domain {0:?}: expected a bare hostname")]
    InvalidDomain(String),

    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("invalid metrics address {0:?}")]
    InvalidMetricsAddress(String),

    #[error("allowed_clients is empty")]
    EmptyAllowedClients,

    #[error("allowed_paths is empty")]
    EmptyAllowedPaths,
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.domain.is_empty() {
        errors.push(ValidationError::MissingDomain);
    } else if !is_hostname(&config.domain) {
        errors.push(ValidationError::InvalidDomain(config.domain.clone()));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.admission.allowed_clients.iter().all(|c| c.is_empty()) {
        errors.push(ValidationError::EmptyAllowedClients);
    }

    if config.admission.allowed_paths.iter().all(|p| p.is_empty()) {
        errors.push(ValidationError::EmptyAllowedPaths);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Dot-separated LDH labels, no port, scheme or path.
fn is_hostname(domain: &str) -> bool {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    !domain.is_empty()
        && domain.len() <= 253
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
