//! [`Guard`] implementations for the security components.
//!
//! The components stay free of HTTP types; these adapters read the request
//! context, call them, and do the forensic logging.

use crate::admission::context::{DenyKind, Guard, Rejection, RequestContext, Stage, Verdict};
use crate::security::bot::{BotClass, BotFilter};
use crate::security::localhost::LocalhostGuard;
use crate::security::origin::OriginGuard;
use crate::security::rate_limit::{RateDecision, RateLimiter};

impl Guard for OriginGuard {
    fn stage(&self) -> Stage {
        Stage::Origin
    }

    fn evaluate(&self, ctx: &RequestContext<'_>) -> Verdict {
        if ctx.internal {
            return Verdict::Continue;
        }

        let declared = ctx.declared_origin();
        match self.check(&declared) {
            Ok(()) => Verdict::Continue,
            Err(denial) => {
                tracing::warn!(
                    identity = %ctx.identity,
                    route = %ctx.route,
                    method = %ctx.method,
                    origin = %declared,
                    "Origin rejected"
                );
                Verdict::Deny(Rejection::new(DenyKind::Origin, denial.describe()))
            }
        }
    }
}

impl Guard for BotFilter {
    fn stage(&self) -> Stage {
        Stage::Bot
    }

    fn evaluate(&self, ctx: &RequestContext<'_>) -> Verdict {
        if ctx.internal {
            return Verdict::Continue;
        }

        let class = self.classify(
            ctx.user_agent(),
            &ctx.identity,
            ctx.internal_token(),
            ctx.on_internal_path(),
        );

        match class {
            BotClass::Human | BotClass::Internal => Verdict::Continue,
            BotClass::Bot { signature } => {
                tracing::warn!(
                    identity = %ctx.identity,
                    route = %ctx.route,
                    method = %ctx.method,
                    signature = %signature,
                    headers = %ctx.forensic_headers(),
                    "Automated client rejected"
                );
                Verdict::Deny(Rejection::new(DenyKind::Bot, "Automated clients are not allowed"))
            }
        }
    }
}

impl Guard for LocalhostGuard {
    fn stage(&self) -> Stage {
        Stage::Localhost
    }

    fn evaluate(&self, ctx: &RequestContext<'_>) -> Verdict {
        if !ctx.policy.localhost_guard || self.check(&ctx.identity) {
            return Verdict::Continue;
        }

        tracing::warn!(
            identity = %ctx.identity,
            route = %ctx.route,
            method = %ctx.method,
            mode = %self.mode(),
            origin = %ctx.declared_origin(),
            referer = ?ctx.referer(),
            headers = %ctx.forensic_headers(),
            "Destructive request from loopback blocked"
        );
        Verdict::Deny(Rejection::new(
            DenyKind::Localhost,
            "Destructive operations from localhost are disabled in development",
        ))
    }
}

impl Guard for RateLimiter {
    fn stage(&self) -> Stage {
        Stage::Rate
    }

    fn evaluate(&self, ctx: &RequestContext<'_>) -> Verdict {
        let Some(tier) = ctx.policy.tier else {
            return Verdict::Continue;
        };

        match self.admit(&ctx.identity, tier) {
            RateDecision::Allow => Verdict::Continue,
            RateDecision::Exempt => {
                tracing::debug!(identity = %ctx.identity, tier = %tier, "Rate limit skipped for exempt identity");
                Verdict::Continue
            }
            RateDecision::Deny {
                retry_after_secs,
                reason,
            } => {
                tracing::warn!(
                    identity = %ctx.identity,
                    tier = %tier,
                    reason = reason.as_str(),
                    retry_after_secs,
                    "Rate limit exceeded"
                );
                Verdict::Deny(Rejection::rate_limited(reason, retry_after_secs))
            }
        }
    }
}
