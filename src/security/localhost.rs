//! Loopback guard for destructive operations.
//!
//! In development a loopback identity is a local developer or script, and it
//! must not run destructive operations against a shared database. In live
//! deployments loopback traffic is the platform's own routing and is allowed.

use crate::config::DeploymentMode;
use crate::security::identity::ClientIdentity;

#[derive(Debug, Clone, Copy)]
pub struct LocalhostGuard {
    mode: DeploymentMode,
}

impl LocalhostGuard {
    pub fn new(mode: DeploymentMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    /// `true` when the request may proceed.
    pub fn check(&self, identity: &ClientIdentity) -> bool {
        check(identity, self.mode)
    }
}

pub fn check(identity: &ClientIdentity, mode: DeploymentMode) -> bool {
    mode.is_live() || !identity.is_loopback()
}
