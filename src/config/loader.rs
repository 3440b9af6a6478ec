//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{DeploymentMode, GateConfig, OriginMode};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values sourced from the process environment (or the command line).
///
/// Each field that is `Some` replaces the file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind_address: Option<String>,
    pub mode: Option<DeploymentMode>,
    pub trust_proxy: Option<bool>,
    pub internal_secret: Option<String>,
    pub allowed_origins: Option<Vec<String>>,
    pub origin_mode_hardened: Option<bool>,
}

impl Overrides {
    /// Apply overrides on top of a file-sourced configuration.
    pub fn apply(self, config: &mut GateConfig) {
        if let Some(bind) = self.bind_address {
            config.listener.bind_address = bind;
        }
        if let Some(mode) = self.mode {
            config.deployment.mode = mode;
        }
        if let Some(trust) = self.trust_proxy {
            config.deployment.trust_proxy = trust;
        }
        if let Some(secret) = self.internal_secret.filter(|s| !s.is_empty()) {
            config.deployment.internal_secret = Some(secret);
        }
        if let Some(origins) = self.allowed_origins {
            config.origin.allowed = origins
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(hardened) = self.origin_mode_hardened {
            config.origin.mode = if hardened {
                OriginMode::Hardened
            } else {
                OriginMode::Permissive
            };
        }
    }
}

/// Load a configuration from an optional TOML file, apply overrides, and validate.
pub fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<GateConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GateConfig::default(),
    };

    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
