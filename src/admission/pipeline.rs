//! The ordered guard chain.
//!
//! ```text
//! START → ORIGIN → BOT → LOCALHOST → RATE → ADMITTED
//!            │       │        │         │
//!            └───────┴────────┴─────────┴──→ REJECTED(reason, status)
//! ```
//!
//! Identity is resolved once. Guards run in a fixed order and the first
//! denial ends the request; the stateful rate limiter runs last so abusive
//! traffic that fails a cheap check never touches its shards.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderMap, Method};
use thiserror::Error;

use crate::admission::audit::AuditRecord;
use crate::admission::context::{Guard, Rejection, RequestContext, Stage, Verdict};
use crate::admission::routes::{RoutePolicy, RouteTable};
use crate::config::GateConfig;
use crate::observability::metrics;
use crate::security::bot::BotFilter;
use crate::security::identity::{ClientIdentity, IdentityResolver};
use crate::security::localhost::LocalhostGuard;
use crate::security::origin::OriginGuard;
use crate::security::rate_limit::RateLimiter;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid bot signature: {0}")]
    Signature(#[from] regex::Error),
}

/// Attached to admitted requests as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub identity: ClientIdentity,
    pub policy: RoutePolicy,
    pub internal: bool,
}

pub struct AdmissionPipeline {
    resolver: IdentityResolver,
    routes: RouteTable,
    bot_filter: Arc<BotFilter>,
    guards: Vec<Arc<dyn Guard>>,
}

impl AdmissionPipeline {
    /// Assemble a pipeline. `bot_filter` decides the internal bypass; it is
    /// normally also one of the `guards`.
    pub fn new(
        resolver: IdentityResolver,
        routes: RouteTable,
        bot_filter: Arc<BotFilter>,
        guards: Vec<Arc<dyn Guard>>,
    ) -> Self {
        Self {
            resolver,
            routes,
            bot_filter,
            guards,
        }
    }

    /// Standard chain: origin, bot, localhost, then rate (when enabled).
    pub fn from_config(config: &GateConfig, limiter: Arc<RateLimiter>) -> Result<Self, PipelineError> {
        let bot_filter = Arc::new(BotFilter::from_config(
            &config.bot,
            config.deployment.internal_secret.as_deref(),
        )?);

        let mut guards: Vec<Arc<dyn Guard>> = vec![
            Arc::new(OriginGuard::from_config(&config.origin)),
            bot_filter.clone(),
            Arc::new(LocalhostGuard::new(config.deployment.mode)),
        ];
        if config.rate_limit.enabled {
            guards.push(limiter);
        }

        Ok(Self::new(
            IdentityResolver::new(config.deployment.trust_proxy),
            RouteTable::default(),
            bot_filter,
            guards,
        ))
    }

    /// Guard stages in evaluation order.
    pub fn stages(&self) -> Vec<Stage> {
        self.guards.iter().map(|g| g.stage()).collect()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Run the chain for one request.
    pub fn admit(
        &self,
        method: &Method,
        route: &str,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
    ) -> Result<Admission, Rejection> {
        let mut ctx = RequestContext {
            identity: self.resolver.resolve(headers, peer),
            method,
            route,
            headers,
            peer,
            policy: self.routes.policy_for(method, route),
            internal: false,
        };
        ctx.internal = self
            .bot_filter
            .is_internal(ctx.internal_token(), ctx.on_internal_path());

        for guard in &self.guards {
            if let Verdict::Deny(rejection) = guard.evaluate(&ctx) {
                AuditRecord::rejected(&ctx.identity, route, method, rejection.kind.reason()).emit();
                metrics::record_rejection(guard.stage().as_str(), rejection.kind.reason());
                return Err(rejection);
            }
        }

        metrics::record_admitted(route);
        Ok(Admission {
            identity: ctx.identity,
            policy: ctx.policy,
            internal: ctx.internal,
        })
    }
}

impl std::fmt::Debug for AdmissionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionPipeline")
            .field("resolver", &self.resolver)
            .field("stages", &self.stages())
            .finish()
    }
}
