//! Audit records: logged on the `audit` target, never stored.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::Method;

use crate::security::identity::ClientIdentity;

pub const AUDIT_TARGET: &str = "audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditDecision {
    Rejected,
    Completed,
}

impl fmt::Display for AuditDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuditDecision::Rejected => "rejected",
            AuditDecision::Completed => "completed",
        })
    }
}

/// One auditable event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub identity: String,
    pub route: String,
    pub verb: String,
    pub decision: AuditDecision,
    pub reason: String,
}

impl AuditRecord {
    fn new(
        identity: &ClientIdentity,
        route: &str,
        verb: &Method,
        decision: AuditDecision,
        reason: impl Into<String>,
    ) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            timestamp_ms,
            identity: identity.to_string(),
            route: route.to_string(),
            verb: verb.to_string(),
            decision,
            reason: reason.into(),
        }
    }

    pub fn rejected(identity: &ClientIdentity, route: &str, verb: &Method, reason: impl Into<String>) -> Self {
        Self::new(identity, route, verb, AuditDecision::Rejected, reason)
    }

    pub fn completed(identity: &ClientIdentity, route: &str, verb: &Method) -> Self {
        Self::new(identity, route, verb, AuditDecision::Completed, "destructive_action")
    }

    /// Write the record to the log.
    pub fn emit(&self) {
        match self.decision {
            AuditDecision::Rejected => tracing::warn!(
                target: AUDIT_TARGET,
                timestamp_ms = self.timestamp_ms,
                identity = %self.identity,
                route = %self.route,
                verb = %self.verb,
                decision = %self.decision,
                reason = %self.reason,
                "Request rejected"
            ),
            AuditDecision::Completed => tracing::info!(
                target: AUDIT_TARGET,
                timestamp_ms = self.timestamp_ms,
                identity = %self.identity,
                route = %self.route,
                verb = %self.verb,
                decision = %self.decision,
                reason = %self.reason,
                "Destructive action completed"
            ),
        }
    }
}
