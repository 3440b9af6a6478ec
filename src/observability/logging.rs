//! Structured logging.
//!
//! `RUST_LOG` wins over the configured level. Output is JSON in live
//! deployments and human-readable in development unless `json_logs` says
//! otherwise.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{DeploymentMode, ObservabilityConfig};

/// Directive used when neither `RUST_LOG` nor the config yields a filter.
pub const DEFAULT_DIRECTIVE: &str = "crud_gate=info,tower_http=info";

pub fn init_logging(config: &ObservabilityConfig, mode: DeploymentMode) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(&config.log_level)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let registry = tracing_subscriber::registry().with(filter);

    if use_json(config, mode) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Expand a bare level such as `debug` into per-crate directives. Anything
/// else is treated as a full filter expression.
fn filter_directive(level: &str) -> String {
    let level = level.trim();
    match level.to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {
            format!("crud_gate={level},tower_http={level},audit={level}")
        }
        "" => DEFAULT_DIRECTIVE.to_string(),
        _ => level.to_string(),
    }
}

fn use_json(config: &ObservabilityConfig, mode: DeploymentMode) -> bool {
    config.json_logs.unwrap_or_else(|| mode.is_live())
}
