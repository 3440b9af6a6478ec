//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Root configuration for the CRUD gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Deployment mode, proxy trust and internal secret.
    pub deployment: DeploymentConfig,

    /// Origin allow-list and missing-origin policy.
    pub origin: OriginConfig,

    /// User-agent signatures for bot detection.
    pub bot: BotConfig,

    /// Per-tier rate limiting policies.
    pub rate_limit: RateLimitConfig,

    /// HTTP hardening settings.
    pub security: SecurityConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Self health check settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Where the process runs. Decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Local developer machine.
    #[default]
    #[serde(alias = "dev", alias = "local")]
    #[value(alias = "dev", alias = "local")]
    Development,
    /// Self-managed production.
    #[serde(alias = "prod")]
    #[value(alias = "prod")]
    Production,
    /// Managed platform behind the provider's router.
    Hosted,
}

impl DeploymentMode {
    /// Production and hosted deployments are both "live".
    pub fn is_live(self) -> bool {
        matches!(self, DeploymentMode::Production | DeploymentMode::Hosted)
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeploymentMode::Development => "development",
            DeploymentMode::Production => "production",
            DeploymentMode::Hosted => "hosted",
        };
        f.write_str(s)
    }
}

/// Deployment-level settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Deployment mode.
    pub mode: DeploymentMode,

    /// Honor client-IP headers injected by a fronting proxy.
    pub trust_proxy: bool,

    /// Shared secret for the internal bypass. `None` disables the bypass.
    #[serde(skip_serializing)]
    pub internal_secret: Option<String>,
}

impl fmt::Debug for DeploymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentConfig")
            .field("mode", &self.mode)
            .field("trust_proxy", &self.trust_proxy)
            .field(
                "internal_secret",
                &self.internal_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            mode: DeploymentMode::Development,
            trust_proxy: false,
            internal_secret: None,
        }
    }
}

/// How a request without an `Origin` header is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OriginMode {
    /// Absent origin is trusted (non-browser clients).
    #[default]
    Permissive,
    /// Absent origin is denied.
    Hardened,
}

/// Origin allow-list configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OriginConfig {
    /// Missing-origin policy.
    pub mode: OriginMode,

    /// Exact origins accepted, e.g. "https://app.example.com".
    pub allowed: Vec<String>,
}

/// Verdict attached to a user-agent signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureVerdict {
    Bot,
    Human,
}

/// One user-agent rule. Patterns are case-insensitive regular expressions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignatureConfig {
    pub pattern: String,
    pub verdict: SignatureVerdict,
}

impl SignatureConfig {
    fn bot(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            verdict: SignatureVerdict::Bot,
        }
    }
}

/// Bot detection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BotConfig {
    /// Ordered signatures; first match wins.
    pub signatures: Vec<SignatureConfig>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            signatures: vec![
                SignatureConfig::bot(r"bot|crawler|spider|scraper"),
                SignatureConfig::bot(r"curl|wget|httpie"),
                SignatureConfig::bot(r"python-requests|python-urllib|aiohttp|scrapy"),
                SignatureConfig::bot(r"axios|node-fetch|undici|got \("),
                SignatureConfig::bot(r"go-http-client|okhttp|java/|libwww-perl"),
                SignatureConfig::bot(r"postmanruntime|insomnia"),
                SignatureConfig::bot(r"headlesschrome|phantomjs|selenium|puppeteer|playwright"),
            ],
        }
    }
}

/// Rate policy for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TierPolicy {
    /// At most one request per `cooldown_secs`.
    Cooldown { cooldown_secs: u64 },
    /// At most `max_requests` admissions in any trailing `window_secs`.
    Window { window_secs: u64, max_requests: u32 },
}

impl TierPolicy {
    /// Time after the last admission beyond which the entry carries no state.
    pub fn horizon(&self) -> Duration {
        match self {
            TierPolicy::Cooldown { cooldown_secs } => Duration::from_secs(*cooldown_secs),
            TierPolicy::Window { window_secs, .. } => Duration::from_secs(*window_secs),
        }
    }

    /// Admissions allowed per horizon.
    pub fn capacity(&self) -> u64 {
        match self {
            TierPolicy::Cooldown { .. } => 1,
            TierPolicy::Window { max_requests, .. } => u64::from(*max_requests),
        }
    }

    /// True when this policy admits no more requests per unit time than `other`.
    pub fn is_at_least_as_strict_as(&self, other: &TierPolicy) -> bool {
        // capacity/horizon <= other.capacity/other.horizon, cross-multiplied
        let lhs = u128::from(self.capacity()) * other.horizon().as_millis();
        let rhs = u128::from(other.capacity()) * self.horizon().as_millis();
        lhs <= rhs
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Policy for read operations.
    pub read: TierPolicy,

    /// Policy for write operations.
    pub write: TierPolicy,

    /// Policy for destructive operations.
    pub destructive: TierPolicy,

    /// Interval between stale-entry sweeps in seconds.
    pub sweep_interval_secs: u64,

    /// Skip rate counting for loopback identities in development mode.
    pub exempt_loopback_in_development: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            read: TierPolicy::Cooldown { cooldown_secs: 1 },
            write: TierPolicy::Window {
                window_secs: 60,
                max_requests: 10,
            },
            destructive: TierPolicy::Window {
                window_secs: 60,
                max_requests: 5,
            },
            sweep_interval_secs: 180,
            exempt_loopback_in_development: true,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security response headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 16 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Self health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the periodic self check (also requires an internal secret).
    pub enabled: bool,

    /// Interval between checks in seconds.
    pub interval_secs: u64,

    /// Upper bound of the random delay added to each interval, in seconds.
    pub jitter_secs: u64,

    /// Per-check timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 300,
            jitter_secs: 30,
            timeout_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Force JSON log output. Defaults to JSON outside development.
    pub json_logs: Option<bool>,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: None,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
