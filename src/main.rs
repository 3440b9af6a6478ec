//! Request admission gateway in front of a small resource CRUD API.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌────────────────────────────────────────────────────┐
//!                     │                     CRUD GATE                      │
//!                     │                                                    │
//!   Client Request    │  ┌─────────┐   ┌───────────────────────────────┐   │
//!   ──────────────────┼─▶│  http   │──▶│          admission            │   │
//!                     │  │ server  │   │ origin → bot → localhost →    │   │
//!                     │  └─────────┘   │ rate                          │   │
//!                     │                └──────────────┬────────────────┘   │
//!                     │                               ▼                    │
//!   Client Response   │  ┌──────────┐          ┌─────────────┐             │
//!   ◀─────────────────┼──│ response │◀─────────│  handlers   │──▶ store    │
//!                     │  └──────────┘          └─────────────┘             │
//!                     │                                                    │
//!                     │  Cross-cutting: config, security, observability,   │
//!                     │  health (self check), lifecycle (startup/shutdown) │
//!                     └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crud_gate::config::{load_config, DeploymentMode, Overrides};
use crud_gate::lifecycle::{self, Shutdown};
use crud_gate::observability;
use crud_gate::store::MemoryStore;

#[derive(Debug, Parser)]
#[command(name = "crud-gate", version, about = "Gated resource CRUD service")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "GATE_CONFIG")]
    config: Option<PathBuf>,

    /// Socket address to listen on.
    #[arg(long, env = "BIND_ADDRESS")]
    bind: Option<String>,

    /// Deployment mode.
    #[arg(long, env = "DEPLOYMENT_MODE", value_enum, ignore_case = true)]
    mode: Option<DeploymentMode>,

    /// Shared secret for internal (loopback) callers.
    #[arg(long, env = "INTERNAL_SECRET", hide_env_values = true)]
    internal_secret: Option<String>,

    /// Comma-separated origin allow-list.
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    allowed_origins: Option<Vec<String>>,

    /// Derive client identity from forwarding headers.
    #[arg(long, env = "TRUST_PROXY")]
    trust_proxy: Option<bool>,

    /// Reject requests that carry no Origin header.
    #[arg(long, env = "HARDENED_ORIGIN")]
    hardened_origin: Option<bool>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            bind_address: self.bind.clone(),
            mode: self.mode,
            trust_proxy: self.trust_proxy,
            internal_secret: self.internal_secret.clone(),
            allowed_origins: self.allowed_origins.clone(),
            origin_mode_hardened: self.hardened_origin,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref(), args.overrides())?;

    observability::init_logging(&config.observability, config.deployment.mode);

    tracing::info!("crud-gate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        mode = %config.deployment.mode,
        trust_proxy = config.deployment.trust_proxy,
        allowed_origins = config.origin.allowed.len(),
        internal_bypass = config.deployment.internal_secret.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        observability::init_metrics(addr)?;
    }

    let store = Arc::new(MemoryStore::new());
    let (server, listener) = lifecycle::prepare(config, store).await?;

    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    lifecycle::spawn_signal_listener(shutdown.clone());

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
