//! Security subsystem: the individual admission guards.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → identity.rs (resolve client identity once)
//!     → origin.rs (allow-list check)
//!     → bot.rs (user-agent heuristics, internal bypass)
//!     → localhost.rs (loopback guard for destructive routes)
//!     → rate_limit.rs (per-identity, per-tier limits)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Cheap stateless checks run before the stateful rate-limit lookup
//! - Fail closed: reject on any security check failure
//! - No trust in client input unless the proxy is trusted

pub mod bot;
pub mod clock;
pub mod headers;
pub mod identity;
pub mod localhost;
pub mod origin;
pub mod rate_limit;

pub use bot::{BotClass, BotFilter, BotSignature};
pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{ClientIdentity, IdentityResolver};
pub use localhost::LocalhostGuard;
pub use origin::{DeclaredOrigin, OriginAllowList, OriginDenial, OriginGuard};
pub use rate_limit::{LimitReason, PolicyTier, RateDecision, RateLimiter, TierPolicies};
