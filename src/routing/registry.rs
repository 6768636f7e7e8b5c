//! Proxied registry table.
//!
//! # Responsibilities
//! - Enumerate every upstream registry the proxy fronts
//! - Map each registry to its proxy subdomain label and upstream authority
//! - Mark which upstreams issue `WWW-Authenticate` realms pointing at themselves
//!
//! # Design Decisions
//! - One variant per registry; upstream-specific rewrite rules dispatch on it
//! - Adding a registry means one variant plus one row in each `match`

use std::fmt;

/// An upstream container registry reachable through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Registry {
    DockerHub,
    DockerAuth,
    Quay,
    Gcr,
    Ghcr,
    K8s,
    Nvcr,
    Cloudsmith,
    Ecr,
}

impl Registry {
    /// All proxied registries.
    pub const ALL: [Registry; 9] = [
        Registry::DockerHub,
        Registry::DockerAuth,
        Registry::Quay,
        Registry::Gcr,
        Registry::Ghcr,
        Registry::K8s,
        Registry::Nvcr,
        Registry::Cloudsmith,
        Registry::Ecr,
    ];

    /// Leftmost label of the proxy hostname (`<subdomain>.<base>`).
    pub fn subdomain(self) -> &'static str {
        match self {
            Registry::DockerHub => "docker",
            Registry::DockerAuth => "auth-docker",
            Registry::Quay => "quay",
            Registry::Gcr => "gcr",
            Registry::Ghcr => "ghcr",
            Registry::K8s => "k8s",
            Registry::Nvcr => "nvcr",
            Registry::Cloudsmith => "cloudsmith",
            Registry::Ecr => "ecr",
        }
    }

    /// Authority requests are forwarded to.
    pub fn upstream(self) -> &'static str {
        match self {
            Registry::DockerHub => "registry-1.docker.io",
            Registry::DockerAuth => "auth.docker.io",
            Registry::Quay => "quay.io",
            Registry::Gcr => "gcr.io",
            Registry::Ghcr => "ghcr.io",
            Registry::K8s => "registry.k8s.io",
            Registry::Nvcr => "nvcr.io",
            Registry::Cloudsmith => "docker.cloudsmith.io",
            Registry::Ecr => "public.ecr.aws",
        }
    }

    /// Whether challenge realms naming this upstream get pointed back at the proxy.
    ///
    /// Docker Hub's registry host never appears as a realm (it delegates to
    /// `auth.docker.io`) and registry.k8s.io does not authenticate pulls.
    pub fn serves_realm(self) -> bool {
        !matches!(self, Registry::DockerHub | Registry::K8s)
    }

    /// Proxy hostname for this registry under `base_domain`.
    pub fn proxy_host(self, base_domain: &str) -> String {
        format!("{}.{}", self.subdomain(), base_domain)
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subdomain())
    }
}
