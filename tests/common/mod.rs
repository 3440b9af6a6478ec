//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crud_gate::config::{DeploymentMode, GateConfig};
use crud_gate::http::HttpServer;
use crud_gate::security::{ManualClock, RateLimiter};
use crud_gate::store::MemoryStore;

pub const SECRET: &str = "integration-secret-0123456789";
pub const ALLOWED_ORIGIN: &str = "https://app.example.com";
pub const BROWSER_UA: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

pub fn remote_peer() -> SocketAddr {
    "203.0.113.7:51000".parse().unwrap()
}

pub fn loopback_peer() -> SocketAddr {
    "127.0.0.1:51000".parse().unwrap()
}

/// Defaults with one allow-listed origin, an internal secret, and no
/// background self check.
pub fn test_config(mode: DeploymentMode) -> GateConfig {
    let mut config = GateConfig::default();
    config.deployment.mode = mode;
    config.deployment.internal_secret = Some(SECRET.to_string());
    config.origin.allowed = vec![ALLOWED_ORIGIN.to_string()];
    config.health_check.enabled = false;
    config
}

pub struct TestApp {
    pub router: Router,
    pub limiter: Arc<RateLimiter>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
}

pub fn spawn_app(config: GateConfig) -> TestApp {
    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(MemoryStore::new());
    let server = HttpServer::with_clock(config, store.clone(), clock.clone()).unwrap();

    TestApp {
        router: server.router(),
        limiter: server.limiter().clone(),
        clock,
        store,
    }
}

/// Request builder that records the transport peer the way the real
/// listener does.
pub struct TestRequest {
    method: Method,
    uri: String,
    peer: SocketAddr,
    headers: Vec<(String, Vec<u8>)>,
    body: Option<String>,
}

impl TestRequest {
    pub fn new(method: Method, uri: &str, peer: SocketAddr) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            peer,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Allowed origin plus a browser user agent.
    pub fn browser(method: Method, uri: &str, peer: SocketAddr) -> Self {
        Self::new(method, uri, peer)
            .header("origin", ALLOWED_ORIGIN)
            .header("user-agent", BROWSER_UA)
    }

    pub fn header(self, name: &str, value: &str) -> Self {
        self.header_bytes(name, value.as_bytes())
    }

    /// Header with raw bytes, for values that are not visible ASCII.
    pub fn header_bytes(mut self, name: &str, value: &[u8]) -> Self {
        self.headers.push((name.to_string(), value.to_vec()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body.to_string());
        self.header("content-type", "application/json")
    }

    pub fn raw_json(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self.header("content-type", "application/json")
    }

    pub fn build(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), HeaderValue::from_bytes(value).unwrap());
        }
        let mut request = builder
            .body(self.body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(self.peer));
        request
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn error_code(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }

    pub fn retry_after(&self) -> Option<u64> {
        self.headers
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }
}

pub async fn send(router: &Router, request: TestRequest) -> TestResponse {
    let response = router.clone().oneshot(request.build()).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    TestResponse {
        status,
        headers,
        body,
    }
}
