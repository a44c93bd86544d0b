//! API Gateway
//!
//! Single entry point in front of the platform's downstream services.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                  API GATEWAY                  │
//!                         │                                               │
//!   Client Request        │  ┌──────────────┐    ┌──────────┐             │
//!   ──────────────────────┼─▶│ http server  │───▶│ routing  │             │
//!                         │  │ + corr. id   │    │ prefixes │             │
//!                         │  └──────────────┘    └────┬─────┘             │
//!                         │                           ▼                   │
//!                         │  ┌──────────────┐    ┌──────────┐             │
//!   Client Response       │  │  registry    │◀──▶│  proxy   │─────────────┼──▶ ehr-proxy
//!   ◀─────────────────────┼──│ + circuit    │    │ timeout  │◀────────────┼─── backend
//!                         │  │   breakers   │    └──────────┘             │    ai-service
//!                         │  └──────▲───────┘                             │
//!                         │         │        ┌──────────────┐             │
//!                         │         └────────│health checker│─────────────┼──▶ /ping
//!                         │                  └──────────────┘             │
//!                         └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use api_gateway::config::{load_config, load_default_config};
use api_gateway::lifecycle::startup;
use api_gateway::observability::logging;

#[derive(Parser)]
#[command(name = "api-gateway")]
#[command(about = "Reverse proxy with per-service circuit breakers and health checks", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file; built-in defaults when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_default_config()?,
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);

    tracing::info!("api-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        routes = config.routes.len(),
        health_checks = config.health_check.enabled,
        "Configuration loaded"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
