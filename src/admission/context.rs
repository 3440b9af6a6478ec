//! Per-request inputs and outputs of the admission guards.

use std::fmt;
use std::net::SocketAddr;

use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};

use crate::admission::routes::RoutePolicy;
use crate::security::bot::X_INTERNAL_SECRET;
use crate::security::identity::ClientIdentity;
use crate::security::origin::DeclaredOrigin;
use crate::security::rate_limit::LimitReason;

/// Everything a guard may look at. Built once per request by the pipeline.
#[derive(Debug)]
pub struct RequestContext<'a> {
    pub identity: ClientIdentity,
    pub method: &'a Method,
    pub route: &'a str,
    pub headers: &'a HeaderMap,
    pub peer: Option<SocketAddr>,
    pub policy: RoutePolicy,
    /// Authenticated internal caller; origin and bot checks are skipped.
    pub internal: bool,
}

impl<'a> RequestContext<'a> {
    fn header(&self, name: &str) -> Option<&'a str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `Origin` as declared, keeping unreadable values distinct from absent ones.
    pub fn declared_origin(&self) -> DeclaredOrigin<'a> {
        DeclaredOrigin::from_bytes(self.headers.get(header::ORIGIN).map(HeaderValue::as_bytes))
    }

    pub fn user_agent(&self) -> Option<&'a str> {
        self.header(header::USER_AGENT.as_str())
    }

    pub fn referer(&self) -> Option<&'a str> {
        self.header(header::REFERER.as_str())
    }

    pub fn internal_token(&self) -> Option<&'a str> {
        self.header(X_INTERNAL_SECRET)
    }

    /// The connection comes from this host.
    pub fn on_internal_path(&self) -> bool {
        self.peer.is_some_and(|addr| match addr.ip() {
            std::net::IpAddr::V6(v6) => v6
                .to_ipv4_mapped()
                .map_or(v6.is_loopback(), |v4| v4.is_loopback()),
            ip => ip.is_loopback(),
        })
    }

    /// Header set for forensic logs, with credentials masked.
    pub fn forensic_headers(&self) -> String {
        let mut out = Vec::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            let shown = if is_sensitive(name.as_str()) {
                "[REDACTED]"
            } else {
                value.to_str().unwrap_or("<non-ascii>")
            };
            out.push(format!("{}={}", name.as_str(), shown));
        }
        out.join("; ")
    }
}

fn is_sensitive(name: &str) -> bool {
    name == X_INTERNAL_SECRET
        || name == header::AUTHORIZATION.as_str()
        || name == header::COOKIE.as_str()
        || name == header::PROXY_AUTHORIZATION.as_str()
}

/// Pipeline stage names, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Origin,
    Bot,
    Localhost,
    Rate,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Origin => "origin",
            Stage::Bot => "bot",
            Stage::Localhost => "localhost",
            Stage::Rate => "rate",
        }
    }
}

/// Kind of admission denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyKind {
    Origin,
    Bot,
    Localhost,
    Rate(LimitReason),
}

impl DenyKind {
    /// Short error code returned to the client.
    pub fn code(self) -> &'static str {
        match self {
            DenyKind::Origin => "origin_denied",
            DenyKind::Bot => "bot_detected",
            DenyKind::Localhost => "localhost_blocked",
            DenyKind::Rate(_) => "rate_limited",
        }
    }

    /// Reason label for logs and metrics.
    pub fn reason(self) -> &'static str {
        match self {
            DenyKind::Rate(reason) => reason.as_str(),
            other => other.code(),
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            DenyKind::Rate(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::FORBIDDEN,
        }
    }
}

/// A guard's refusal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: DenyKind,
    pub message: String,
    pub retry_after_secs: Option<u64>,
}

impl Rejection {
    pub fn new(kind: DenyKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after_secs: None,
        }
    }

    pub fn rate_limited(reason: LimitReason, retry_after_secs: u64) -> Self {
        Self {
            kind: DenyKind::Rate(reason),
            message: format!("Too many requests, retry in {retry_after_secs} seconds"),
            retry_after_secs: Some(retry_after_secs),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

/// Result of one guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Deny(Rejection),
}

/// A single admission check.
pub trait Guard: Send + Sync {
    fn stage(&self) -> Stage;

    fn evaluate(&self, ctx: &RequestContext<'_>) -> Verdict;
}

impl<G: Guard + ?Sized> Guard for std::sync::Arc<G> {
    fn stage(&self) -> Stage {
        (**self).stage()
    }

    fn evaluate(&self, ctx: &RequestContext<'_>) -> Verdict {
        (**self).evaluate(ctx)
    }
}
