//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment / CLI overrides (mode, secret, origins, proxy trust)
//!     → validation.rs (semantic checks)
//!     → GateConfig (validated, immutable)
//!     → passed to guard constructors at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, Overrides};
pub use schema::{
    BotConfig, DeploymentConfig, DeploymentMode, GateConfig, HealthCheckConfig, ListenerConfig,
    ObservabilityConfig, OriginConfig, OriginMode, RateLimitConfig, SecurityConfig,
    SignatureConfig, SignatureVerdict, TierPolicy, TimeoutConfig,
};
pub use validation::ValidationError;
