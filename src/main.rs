//! Container registry reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────────────┐
//!                    │                     REGISTRY PROXY                        │
//!                    │                                                           │
//!  Client Request    │  ┌──────────┐   ┌───────────┐   ┌─────────┐   ┌────────┐  │
//!  ──────────────────┼─▶│ security │──▶│  routing  │──▶│ request │──▶│upstream│──┼──▶ registry-1.docker.io
//!  docker.<domain>   │  │admission │   │DomainMap  │   │ rewrite │   │ reqwest│  │    quay.io, ghcr.io, ...
//!                    │  └──────────┘   └───────────┘   └─────────┘   └───┬────┘  │
//!                    │                                                   │       │
//!  Client Response   │                 ┌────────────────────┐            │       │
//!  ◀─────────────────┼─────────────────│ response rewrite   │◀───────────┘       │
//!                    │                 │ (WWW-Authenticate) │                    │
//!                    │                 └────────────────────┘                    │
//!                    └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use registry_proxy::config::{read_config, validate_config, ConfigError, ProxyConfig};
use registry_proxy::lifecycle::{signals, Shutdown};
use registry_proxy::observability::{logging, metrics};
use registry_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "registry-proxy")]
#[command(about = "Reverse proxy for container registries behind one domain", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "REGISTRY_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Base domain; registries are served at `<registry>.<domain>`.
    #[arg(short, long, env = "DOMAIN")]
    domain: Option<String>,

    /// Listen address, e.g. 0.0.0.0:8080.
    #[arg(short, long, env = "BIND_ADDRESS")]
    bind: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };
        if let Some(domain) = self.domain {
            config.domain = domain;
        }
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init(&config.observability);

    tracing::info!("registry-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        domain = %config.domain,
        bind_address = %config.listener.bind_address,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validated above.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
