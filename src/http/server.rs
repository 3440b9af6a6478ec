//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for the resource routes
//! - Install the admission middleware on matched routes only
//! - Wire up hardening (security headers, CORS, body limit, timeout)
//! - Wire up request IDs, tracing and panic catching
//! - Spawn the rate-limit sweeper and the self health check
//! - Serve with graceful shutdown

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{post, put},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admission::{
    admission_middleware, AdmissionPipeline, PipelineError, RESOURCE_COLLECTION, RESOURCE_ITEM,
};
use crate::config::GateConfig;
use crate::health::SelfHealthCheck;
use crate::http::handlers::{create_resource, delete_resource, list_resources, update_resource};
use crate::http::request::{request_span, UuidRequestId, X_REQUEST_ID};
use crate::http::response::{ApiError, ErrorBody};
use crate::lifecycle::Shutdown;
use crate::security::clock::{Clock, SystemClock};
use crate::security::headers::{cors_layer, with_security_headers};
use crate::security::origin::OriginGuard;
use crate::security::rate_limit::RateLimiter;
use crate::store::ResourceStore;

/// Application state injected into handlers and the admission middleware.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AdmissionPipeline>,
    pub store: Arc<dyn ResourceStore>,
}

/// HTTP server for the gated resource API.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
    limiter: Arc<RateLimiter>,
}

impl HttpServer {
    pub fn new(config: GateConfig, store: Arc<dyn ResourceStore>) -> Result<Self, PipelineError> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Build with an explicit clock for the rate limiter.
    pub fn with_clock(
        config: GateConfig,
        store: Arc<dyn ResourceStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PipelineError> {
        let limiter = Arc::new(RateLimiter::from_config(
            &config.rate_limit,
            config.deployment.mode,
            clock,
        ));
        let pipeline = Arc::new(AdmissionPipeline::from_config(&config, limiter.clone())?);

        tracing::debug!(stages = ?pipeline.stages(), "Admission pipeline assembled");

        let state = AppState { pipeline, store };
        let router = Self::build_router(&config, state);

        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GateConfig, state: AppState) -> Router {
        let allow_list = OriginGuard::from_config(&config.origin).allow_list().clone();

        let router = Router::new()
            .route(RESOURCE_COLLECTION, post(create_resource).get(list_resources))
            .route(RESOURCE_ITEM, put(update_resource).delete(delete_resource))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                admission_middleware,
            ))
            .fallback(|| async { ApiError::NotFound })
            .with_state(state)
            // enforced by the body extractors so an oversized body becomes a JSON 413
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(cors_layer(&allow_list))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(CatchPanicLayer::custom(panic_response));

        let router = if config.security.enable_headers {
            with_security_headers(router, config.deployment.mode)
        } else {
            router
        };

        router
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<axum::body::Body>| request_span(request),
            ))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// A clone of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mode = %self.config.deployment.mode,
            "HTTP server starting"
        );

        if self.config.rate_limit.enabled {
            let every = Duration::from_secs(self.config.rate_limit.sweep_interval_secs);
            tokio::spawn(self.limiter.clone().run_sweeper(every, shutdown.subscribe()));
        }

        if self.config.health_check.enabled {
            match SelfHealthCheck::from_config(&self.config, addr) {
                Ok(Some(check)) => {
                    tokio::spawn(check.run(shutdown.subscribe()));
                }
                Ok(None) => {
                    tracing::info!("Self health check disabled: no internal secret configured");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build self health check client");
                }
            }
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut stop = shutdown.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
                tracing::info!("Draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "internal_error",
            msg: "Internal server error".to_string(),
        }),
    )
        .into_response()
}
