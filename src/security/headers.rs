//! Security response headers and CORS.
//!
//! # Responsibilities
//! - Add hardening headers to every response (nosniff, frame denial, ...)
//! - Add HSTS outside development
//! - Advertise CORS only for allow-listed origins
//!
//! Headers set by a handler are never overwritten.

use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::DeploymentMode;
use crate::security::origin::OriginAllowList;

/// Static hardening headers applied to every response.
pub fn security_headers(mode: DeploymentMode) -> Vec<(HeaderName, HeaderValue)> {
    let mut headers = vec![
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
        (header::X_DNS_PREFETCH_CONTROL, HeaderValue::from_static("off")),
        (
            HeaderName::from_static("cross-origin-opener-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            HeaderName::from_static("cross-origin-resource-policy"),
            HeaderValue::from_static("same-origin"),
        ),
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ),
    ];

    if mode.is_live() {
        headers.push((
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ));
    }

    headers
}

/// Wrap a router with the hardening headers.
pub fn with_security_headers<S>(router: Router<S>, mode: DeploymentMode) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    security_headers(mode)
        .into_iter()
        .fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::if_not_present(name, value))
        })
}

/// CORS restricted to the allow-list.
pub fn cors_layer(allow_list: &OriginAllowList) -> CorsLayer {
    let origins: Vec<HeaderValue> = allow_list
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Skipping origin that is not a valid header value");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}
