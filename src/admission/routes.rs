//! Route policy table: which tier and extra guards apply per verb and path.

use axum::http::Method;

use crate::security::rate_limit::PolicyTier;

pub const RESOURCE_COLLECTION: &str = "/resource";
pub const RESOURCE_ITEM: &str = "/resource/{id}";

/// Admission requirements of one route-verb combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePolicy {
    /// Rate tier, or `None` for no rate gate.
    pub tier: Option<PolicyTier>,
    /// Apply the loopback guard.
    pub localhost_guard: bool,
    /// Emit an audit record when the handler succeeds.
    pub audit_completion: bool,
}

impl RoutePolicy {
    /// Origin and bot checks only.
    pub const fn read() -> Self {
        Self {
            tier: None,
            localhost_guard: false,
            audit_completion: false,
        }
    }

    pub const fn write() -> Self {
        Self {
            tier: Some(PolicyTier::Write),
            localhost_guard: false,
            audit_completion: false,
        }
    }

    pub const fn guarded_write() -> Self {
        Self {
            tier: Some(PolicyTier::Write),
            localhost_guard: true,
            audit_completion: false,
        }
    }

    pub const fn destructive() -> Self {
        Self {
            tier: Some(PolicyTier::Destructive),
            localhost_guard: true,
            audit_completion: true,
        }
    }
}

/// Fixed mapping from (verb, route template) to policy.
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<(Method, &'static str, RoutePolicy)>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            entries: vec![
                (Method::POST, RESOURCE_COLLECTION, RoutePolicy::write()),
                (Method::GET, RESOURCE_COLLECTION, RoutePolicy::read()),
                (Method::PUT, RESOURCE_ITEM, RoutePolicy::guarded_write()),
                (Method::DELETE, RESOURCE_ITEM, RoutePolicy::destructive()),
            ],
        }
    }
}

impl RouteTable {
    /// Policy for a matched route. Unlisted combinations (e.g. `HEAD`) get
    /// the read policy.
    pub fn policy_for(&self, method: &Method, route: &str) -> RoutePolicy {
        self.entries
            .iter()
            .find(|(m, r, _)| m == method && *r == route)
            .map(|(_, _, policy)| *policy)
            .unwrap_or_else(RoutePolicy::read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_tiers() {
        let table = RouteTable::default();
        assert_eq!(table.policy_for(&Method::GET, RESOURCE_COLLECTION).tier, None);
        assert_eq!(
            table.policy_for(&Method::POST, RESOURCE_COLLECTION).tier,
            Some(PolicyTier::Write)
        );

        let put = table.policy_for(&Method::PUT, RESOURCE_ITEM);
        assert_eq!(put.tier, Some(PolicyTier::Write));
        assert!(put.localhost_guard);
        assert!(!put.audit_completion);

        let delete = table.policy_for(&Method::DELETE, RESOURCE_ITEM);
        assert_eq!(delete.tier, Some(PolicyTier::Destructive));
        assert!(delete.localhost_guard && delete.audit_completion);
    }

    #[test]
    fn test_unlisted_falls_back_to_read() {
        let table = RouteTable::default();
        assert_eq!(table.policy_for(&Method::HEAD, RESOURCE_COLLECTION), RoutePolicy::read());
    }
}
