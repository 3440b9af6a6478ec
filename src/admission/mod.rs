//! Request admission subsystem.
//!
//! # Data Flow
//! ```text
//! Matched request
//!     → middleware.rs (extract route, peer, headers)
//!     → pipeline.rs (resolve identity, internal bypass, run guards in order)
//!         → guards.rs (origin, bot, localhost, rate adapters)
//!     → audit.rs (rejections and destructive completions)
//!     → handler, or rejection response
//! ```
//!
//! # Design Decisions
//! - Guards are objects in an ordered list, not nested closures
//! - Per-route requirements live in routes.rs as data
//! - No guard awaits; decisions come from memory and headers only

pub mod audit;
pub mod context;
pub mod guards;
pub mod middleware;
pub mod pipeline;
pub mod routes;

pub use audit::{AuditDecision, AuditRecord};
pub use context::{DenyKind, Guard, Rejection, RequestContext, Stage, Verdict};
pub use middleware::admission_middleware;
pub use pipeline::{Admission, AdmissionPipeline, PipelineError};
pub use routes::{RoutePolicy, RouteTable, RESOURCE_COLLECTION, RESOURCE_ITEM};
