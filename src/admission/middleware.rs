//! Axum middleware running the admission pipeline on matched routes.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, MatchedPath, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::admission::audit::AuditRecord;
use crate::http::response::ApiError;
use crate::http::server::AppState;

/// Must be installed with `route_layer` so `MatchedPath` is available.
pub async fn admission_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let method = request.method().clone();

    let admission = match state.pipeline.admit(&method, &route, request.headers(), peer) {
        Ok(admission) => admission,
        Err(rejection) => return ApiError::Denied(rejection).into_response(),
    };

    let audit_completion = admission.policy.audit_completion;
    let identity = admission.identity.clone();
    request.extensions_mut().insert(admission);

    let response = next.run(request).await;

    if audit_completion && response.status().is_success() {
        AuditRecord::completed(&identity, &route, &method).emit();
    }

    response
}
