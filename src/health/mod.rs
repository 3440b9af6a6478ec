//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Jittered timer
//!     → self_check.rs (GET own collection over loopback, internal secret)
//!     → admission bypass → store
//!     → outcome logged and counted
//! ```

pub mod self_check;

pub use self_check::{ProbeOutcome, SelfHealthCheck};
