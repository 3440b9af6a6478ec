//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! admission, security, health:
//!     → logging.rs (structured events, `audit` target for decisions)
//!     → metrics.rs (counters and gauges, Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - JSON logs in live deployments
//! - Request ID travels in the `x-request-id` header and the trace span
//! - Metrics are cheap and silently dropped when no exporter is installed

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
