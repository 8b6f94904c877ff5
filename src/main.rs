//! Integration gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                INTEGRATION GATEWAY               │
//!                         │                                                  │
//!     Client Request      │  ┌─────────┐    ┌──────────┐    ┌────────────┐   │
//!     ────────────────────┼─▶│  http   │───▶│ routing  │───▶│  inbound   │   │
//!                         │  │ server  │    │  rules   │    │  adapter   │   │
//!                         │  └─────────┘    └──────────┘    └─────┬──────┘   │
//!                         │                                       ▼          │
//!                         │                 ┌──────────────────────────────┐ │
//!                         │                 │ dispatcher                   │ │
//!                         │                 │ timeout(retry(breaker(send)))│ │
//!                         │                 └─────────────┬────────────────┘ │
//!                         │                               ▼                  │
//!     Client Response     │  ┌──────────┐           ┌────────────┐           │
//!     ◀───────────────────┼──│ response │◀──────────│  outbound  │◀──────────┼──── Proxy API
//!                         │  │  relay   │           │   sender   │           │
//!                         │  └──────────┘           └────────────┘           │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use integration_gateway::config::{load_config, validation::validate_config, ConfigError, GatewayConfig};
use integration_gateway::lifecycle::{self, Shutdown};
use integration_gateway::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "integration-gateway", version, about = "Forward HTTP requests to an integration endpoint")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            let config = GatewayConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            config
        }
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config_file = ?args.config,
        bind_address = %config.listener.bind_address,
        circuit_breaker = config.circuit_breaker.activate,
        retry = config.circuit_breaker.activate && config.circuit_breaker.retry.activate,
        time_limiter = config.circuit_breaker.activate && config.circuit_breaker.time_limiter.activate,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    lifecycle::start(config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
