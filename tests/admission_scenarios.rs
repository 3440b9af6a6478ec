//! End-to-end admission behaviour through the full router.

use std::time::Duration;

use axum::http::{Method, StatusCode};
use serde_json::json;

use crud_gate::config::{DeploymentMode, OriginMode};
use crud_gate::security::{ClientIdentity, PolicyTier};

mod common;
use common::{loopback_peer, remote_peer, send, spawn_app, test_config, TestRequest, SECRET};

#[tokio::test]
async fn test_destructive_from_foreign_origin_leaves_no_rate_state() {
    let app = spawn_app(test_config(DeploymentMode::Production));

    let response = send(
        &app.router,
        TestRequest::new(Method::DELETE, "/resource/1", remote_peer())
            .header("origin", "https://evil.example")
            .header("user-agent", common::BROWSER_UA),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("origin_denied"));
    assert_eq!(app.limiter.tracked_entries(), 0);
}

#[tokio::test]
async fn test_unreadable_origin_is_denied_not_treated_as_missing() {
    let app = spawn_app(test_config(DeploymentMode::Production));

    let response = send(
        &app.router,
        TestRequest::new(Method::GET, "/resource", remote_peer())
            .header_bytes("origin", b"https://evil\xff.example")
            .header("user-agent", common::BROWSER_UA),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("origin_denied"));
    assert_eq!(app.limiter.tracked_entries(), 0);
}

#[tokio::test]
async fn test_unreadable_user_agent_is_a_bot() {
    let app = spawn_app(test_config(DeploymentMode::Production));

    let response = send(
        &app.router,
        TestRequest::new(Method::GET, "/resource", remote_peer())
            .header("origin", common::ALLOWED_ORIGIN)
            .header_bytes("user-agent", b"Mozilla/5.0 (X11; Linux \xe9)"),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("bot_detected"));
}

#[tokio::test]
async fn test_unreadable_internal_secret_grants_no_bypass() {
    let app = spawn_app(test_config(DeploymentMode::Production));
    let mut secret = SECRET.as_bytes().to_vec();
    secret.push(0xff);

    let response = send(
        &app.router,
        TestRequest::new(Method::GET, "/resource", loopback_peer()).header_bytes("x-internal-secret", &secret),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("bot_detected"));
}

#[tokio::test]
async fn test_eleventh_write_in_window_is_rate_limited() {
    let app = spawn_app(test_config(DeploymentMode::Production));

    for i in 0..10 {
        let response = send(
            &app.router,
            TestRequest::browser(Method::POST, "/resource", remote_peer())
                .json(json!({ "text": format!("note {i}") })),
        )
        .await;
        assert_eq!(response.status, StatusCode::OK, "write {i}");
    }

    let response = send(
        &app.router,
        TestRequest::browser(Method::POST, "/resource", remote_peer())
            .json(json!({ "text": "one too many" })),
    )
    .await;

    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.error_code(), Some("rate_limited"));
    let retry = response.retry_after().expect("retry-after header");
    assert!((1..=60).contains(&retry));

    app.clock.advance(Duration::from_secs(60));
    let response = send(
        &app.router,
        TestRequest::browser(Method::POST, "/resource", remote_peer())
            .json(json!({ "text": "after the window" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_is_per_identity() {
    let app = spawn_app(test_config(DeploymentMode::Production));

    for _ in 0..10 {
        send(
            &app.router,
            TestRequest::browser(Method::POST, "/resource", remote_peer())
                .json(json!({ "text": "busy" })),
        )
        .await;
    }

    let other = "198.51.100.20:40000".parse().unwrap();
    let response = send(
        &app.router,
        TestRequest::browser(Method::POST, "/resource", other).json(json!({ "text": "quiet" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_internal_probe_bypasses_bot_filter() {
    let mut config = test_config(DeploymentMode::Production);
    config.origin.mode = OriginMode::Hardened;
    let app = spawn_app(config);

    let response = send(
        &app.router,
        TestRequest::new(Method::GET, "/resource", loopback_peer()).header("x-internal-secret", SECRET),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!([]));
}

#[tokio::test]
async fn test_internal_secret_requires_internal_path() {
    let app = spawn_app(test_config(DeploymentMode::Production));

    let response = send(
        &app.router,
        TestRequest::new(Method::GET, "/resource", remote_peer()).header("x-internal-secret", SECRET),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("bot_detected"));
}

#[tokio::test]
async fn test_wrong_secret_and_empty_user_agent_is_bot() {
    let app = spawn_app(test_config(DeploymentMode::Production));

    let response = send(
        &app.router,
        TestRequest::new(Method::GET, "/resource", loopback_peer())
            .header("x-internal-secret", "integration-secret-wrong-value"),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("bot_detected"));
}

#[tokio::test]
async fn test_scripted_client_is_rejected() {
    let app = spawn_app(test_config(DeploymentMode::Production));

    let response = send(
        &app.router,
        TestRequest::new(Method::GET, "/resource", remote_peer()).header("user-agent", "curl/8.5.0"),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("bot_detected"));
}

#[tokio::test]
async fn test_loopback_delete_blocked_in_development() {
    let app = spawn_app(test_config(DeploymentMode::Development));

    let response = send(
        &app.router,
        TestRequest::browser(Method::DELETE, "/resource/1", loopback_peer()),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("localhost_blocked"));
}

#[tokio::test]
async fn test_loopback_delete_allowed_when_hosted() {
    for mode in [DeploymentMode::Hosted, DeploymentMode::Production] {
        let app = spawn_app(test_config(mode));

        let created = send(
            &app.router,
            TestRequest::browser(Method::POST, "/resource", loopback_peer())
                .json(json!({ "text": "to delete" })),
        )
        .await;
        assert_eq!(created.status, StatusCode::OK);
        let id = created.body["id"].as_u64().unwrap();

        let response = send(
            &app.router,
            TestRequest::browser(Method::DELETE, &format!("/resource/{id}"), loopback_peer()),
        )
        .await;

        assert_eq!(response.status, StatusCode::OK, "{mode}");
        assert_eq!(response.body, json!({ "msg": "deleted" }));
        assert!(app
            .limiter
            .is_tracking(&ClientIdentity::new("127.0.0.1"), PolicyTier::Destructive));
    }
}

#[tokio::test]
async fn test_loopback_update_blocked_in_development() {
    let app = spawn_app(test_config(DeploymentMode::Development));

    let response = send(
        &app.router,
        TestRequest::browser(Method::PUT, "/resource/1", loopback_peer())
            .json(json!({ "text": "edit" })),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("localhost_blocked"));
}

#[tokio::test]
async fn test_hardened_origin_requires_header() {
    let mut config = test_config(DeploymentMode::Production);
    config.origin.mode = OriginMode::Hardened;
    let app = spawn_app(config);

    let response = send(
        &app.router,
        TestRequest::new(Method::GET, "/resource", remote_peer()).header("user-agent", common::BROWSER_UA),
    )
    .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), Some("origin_denied"));

    let response = send(&app.router, TestRequest::browser(Method::GET, "/resource", remote_peer())).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_trusted_proxy_keys_rate_limit_on_forwarded_client() {
    let mut config = test_config(DeploymentMode::Production);
    config.deployment.trust_proxy = true;
    let app = spawn_app(config);

    let response = send(
        &app.router,
        TestRequest::browser(Method::POST, "/resource", loopback_peer())
            .header("x-forwarded-for", "192.0.2.44, 10.0.0.1")
            .json(json!({ "text": "via proxy" })),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(app
        .limiter
        .is_tracking(&ClientIdentity::new("192.0.2.44"), PolicyTier::Write));
    assert!(!app
        .limiter
        .is_tracking(&ClientIdentity::new("127.0.0.1"), PolicyTier::Write));
}

#[tokio::test]
async fn test_rejections_carry_security_headers_and_request_id() {
    let app = spawn_app(test_config(DeploymentMode::Production));

    let response = send(
        &app.router,
        TestRequest::new(Method::GET, "/resource", remote_peer()).header("user-agent", "python-requests/2.31"),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "DENY");
    assert!(response.headers.contains_key("strict-transport-security"));
    assert!(response.headers.contains_key("x-request-id"));
}
