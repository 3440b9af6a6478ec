//! Configuration validation.
//!
//! Serde handles syntax; this module checks semantics. Every error is
//! collected so the operator sees the whole list at once.

use std::net::SocketAddr;

use regex::RegexBuilder;
use thiserror::Error;
use url::Url;

use crate::config::schema::{GateConfig, OriginMode, TierPolicy};

/// Minimum accepted length of the internal shared secret.
pub const MIN_SECRET_LEN: usize = 16;

/// Longest accepted cooldown or window for a rate tier (one day).
pub const MAX_HORIZON_SECS: u64 = 86_400;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid socket address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("rate tier {tier} has a zero-length window or zero capacity")]
    EmptyTier { tier: &'static str },

    #[error("rate tier {tier} horizon of {secs}s exceeds the {MAX_HORIZON_SECS}s maximum")]
    HorizonTooLong { tier: &'static str, secs: u64 },

    #[error("destructive tier must be at least as strict as the write tier")]
    DestructiveLooserThanWrite,

    #[error("sweep interval must be greater than zero")]
    ZeroSweepInterval,

    #[error("allowed origin {0:?} is not a bare scheme://host[:port] origin")]
    InvalidOrigin(String),

    #[error("hardened origin mode requires a non-empty allow list")]
    HardenedWithoutOrigins,

    #[error("bot signature {pattern:?} does not compile: {reason}")]
    InvalidSignature { pattern: String, reason: String },

    #[error("internal secret must be at least {MIN_SECRET_LEN} bytes")]
    WeakInternalSecret,

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let rate = &config.rate_limit;
    for (tier, policy) in [("read", &rate.read), ("write", &rate.write), ("destructive", &rate.destructive)] {
        if is_empty_tier(policy) {
            errors.push(ValidationError::EmptyTier { tier });
        }
        let secs = policy.horizon().as_secs();
        if secs > MAX_HORIZON_SECS {
            errors.push(ValidationError::HorizonTooLong { tier, secs });
        }
    }
    if !rate.destructive.is_at_least_as_strict_as(&rate.write) {
        errors.push(ValidationError::DestructiveLooserThanWrite);
    }
    if rate.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }

    for origin in &config.origin.allowed {
        if !is_bare_origin(origin) {
            errors.push(ValidationError::InvalidOrigin(origin.clone()));
        }
    }
    if config.origin.mode == OriginMode::Hardened && config.origin.allowed.is_empty() {
        errors.push(ValidationError::HardenedWithoutOrigins);
    }

    for signature in &config.bot.signatures {
        if let Err(e) = RegexBuilder::new(&signature.pattern).case_insensitive(true).build() {
            errors.push(ValidationError::InvalidSignature {
                pattern: signature.pattern.clone(),
                reason: e.to_string(),
            });
        }
    }

    if let Some(secret) = &config.deployment.internal_secret {
        if secret.len() < MIN_SECRET_LEN {
            errors.push(ValidationError::WeakInternalSecret);
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue { field: "timeouts.request_secs" });
    }
    if config.health_check.enabled && config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroValue { field: "health_check.interval_secs" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_empty_tier(policy: &TierPolicy) -> bool {
    policy.horizon().is_zero() || policy.capacity() == 0
}

/// Browsers send `Origin` as scheme, host and optional port with no path.
fn is_bare_origin(origin: &str) -> bool {
    match Url::parse(origin) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.path() == "/"
                && !origin.ends_with('/')
                && url.query().is_none()
                && url.fragment().is_none()
                && url.username().is_empty()
        }
        Err(_) => false,
    }
}
