//! Client identity resolution behind proxies.
//!
//! # Resolution order (first present, non-empty wins)
//! 1. `cf-connecting-ip` (edge network)
//! 2. `true-client-ip`
//! 3. first hop of `x-forwarded-for`
//! 4. transport peer address
//!
//! Header sources are only consulted when proxy trust is enabled; otherwise a
//! client could pick its own identity and dodge the rate limiter.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const TRUE_CLIENT_IP: &str = "true-client-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Sentinel used when no source yields an address.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Canonical token for one requester. Rate-limit and audit key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn unknown() -> Self {
        Self(UNKNOWN_IDENTITY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identity parsed as an IP address, if it is one.
    pub fn ip(&self) -> Option<IpAddr> {
        self.0.parse::<IpAddr>().ok().map(canonical_ip)
    }

    pub fn is_loopback(&self) -> bool {
        self.ip().is_some_and(|ip| ip.is_loopback())
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives a [`ClientIdentity`] from headers and the transport address.
#[derive(Debug, Clone, Copy)]
pub struct IdentityResolver {
    trust_proxy: bool,
}

impl IdentityResolver {
    pub fn new(trust_proxy: bool) -> Self {
        Self { trust_proxy }
    }

    pub fn trusts_proxy(&self) -> bool {
        self.trust_proxy
    }

    pub fn resolve(&self, headers: &HeaderMap, transport: Option<SocketAddr>) -> ClientIdentity {
        resolve(headers, transport, self.trust_proxy)
    }
}

/// Resolve the identity of the requester. Never fails.
pub fn resolve(headers: &HeaderMap, transport: Option<SocketAddr>, trust_proxy: bool) -> ClientIdentity {
    if trust_proxy {
        let from_headers = header_value(headers, CF_CONNECTING_IP)
            .or_else(|| header_value(headers, TRUE_CLIENT_IP))
            .or_else(|| {
                header_value(headers, X_FORWARDED_FOR)
                    .and_then(|chain| chain.split(',').next())
                    .map(str::trim)
                    .filter(|hop| !hop.is_empty())
            });

        if let Some(value) = from_headers {
            return ClientIdentity(normalize(value));
        }
    }

    match transport {
        Some(addr) => ClientIdentity(canonical_ip(addr.ip()).to_string()),
        None => ClientIdentity::unknown(),
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(UNKNOWN_IDENTITY))
}

/// Fold IPv4-mapped IPv6 into IPv4 so one client keeps one identity.
fn canonical_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    }
}

fn normalize(value: &str) -> String {
    match value.parse::<IpAddr>() {
        Ok(ip) => canonical_ip(ip).to_string(),
        Err(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    fn peer() -> Option<SocketAddr> {
        Some("10.0.0.7:51234".parse().unwrap())
    }

    #[test]
    fn test_edge_header_wins() {
        let h = headers(&[
            (CF_CONNECTING_IP, "203.0.113.9"),
            (TRUE_CLIENT_IP, "198.51.100.1"),
            (X_FORWARDED_FOR, "192.0.2.1, 10.0.0.1"),
        ]);
        assert_eq!(resolve(&h, peer(), true).as_str(), "203.0.113.9");
    }

    #[test]
    fn test_true_client_ip_before_forwarded_for() {
        let h = headers(&[(TRUE_CLIENT_IP, "198.51.100.1"), (X_FORWARDED_FOR, "192.0.2.1")]);
        assert_eq!(resolve(&h, peer(), true).as_str(), "198.51.100.1");
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let h = headers(&[(X_FORWARDED_FOR, " 192.0.2.1 , 10.0.0.1, 10.0.0.2")]);
        assert_eq!(resolve(&h, peer(), true).as_str(), "192.0.2.1");
    }

    #[test]
    fn test_untrusted_proxy_ignores_headers() {
        let h = headers(&[(CF_CONNECTING_IP, "203.0.113.9"), (X_FORWARDED_FOR, "192.0.2.1")]);
        assert_eq!(resolve(&h, peer(), false).as_str(), "10.0.0.7");
    }

    #[test]
    fn test_empty_headers_fall_through() {
        let h = headers(&[(CF_CONNECTING_IP, "  "), (X_FORWARDED_FOR, ",10.0.0.1")]);
        assert_eq!(resolve(&h, peer(), true).as_str(), "10.0.0.7");
    }

    #[test]
    fn test_unknown_sentinel() {
        let id = resolve(&HeaderMap::new(), None, true);
        assert_eq!(id, ClientIdentity::unknown());
        assert!(!id.is_loopback());
    }

    #[test]
    fn test_mapped_ipv6_is_folded() {
        let addr: SocketAddr = "[::ffff:127.0.0.1]:3000".parse().unwrap();
        let id = resolve(&HeaderMap::new(), Some(addr), false);
        assert_eq!(id.as_str(), "127.0.0.1");
        assert!(id.is_loopback());
        assert!(ClientIdentity::new("::1").is_loopback());
    }

    #[test]
    fn test_deterministic() {
        let h = headers(&[(X_FORWARDED_FOR, "192.0.2.1")]);
        let resolver = IdentityResolver::new(true);
        assert_eq!(resolver.resolve(&h, peer()), resolver.resolve(&h, peer()));
    }
}
