//! End-to-end API tests
//!
//! Drive the full router against an in-memory ledger, one isolated
//! app instance per test.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use login_sentinel::models::NewLoginAttempt;
use login_sentinel::storage::{Ledger, MemoryLedger};
use login_sentinel::{create_router, AppState, Config};

fn test_config() -> Config {
    Config {
        login_max_requests: 5,
        api_max_requests: 1000,
        ..Config::default()
    }
}

fn test_app(config: Config) -> (Router, Arc<MemoryLedger>) {
    let ledger = Arc::new(MemoryLedger::new());
    let state = AppState::new(config, ledger.clone());
    (create_router(state), ledger)
}

fn post_json(uri: &str, address: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", address)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_authed(uri: &str, address: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-forwarded-for", address)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register(app: &Router, username: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/register",
            "192.0.2.1",
            json!({ "username": username, "password": password }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public_and_reports_ledger_state() {
    let (app, _) = test_app(test_config());
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["ledger"], "reachable");
    assert!(body["tracked_addresses"].is_number());
}

#[tokio::test]
async fn login_succeeds_with_valid_credentials() {
    let (app, ledger) = test_app(test_config());
    register(&app, "alice", "correct horse").await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/login",
            "203.0.113.5",
            json!({ "username": "alice", "password": "correct horse" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["user"]["username"], "alice");
    assert!(body["token"].as_str().unwrap().len() > 20);
    let score = body["riskScore"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&score));

    // Exactly one attempt recorded, successful and unblocked.
    let attempts = ledger.recent_attempts(10).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].success);
    assert!(!attempts[0].blocked);
    assert_eq!(attempts[0].address, "203.0.113.5");
}

#[tokio::test]
async fn wrong_password_returns_401_with_score() {
    let (app, ledger) = test_app(test_config());
    register(&app, "alice", "correct horse").await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/login",
            "203.0.113.6",
            json!({ "username": "alice", "password": "wrong" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid credentials");
    assert!(body["riskScore"].is_number());

    let attempts = ledger.recent_attempts(10).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(!attempts[0].success);
    assert!(!attempts[0].blocked);
}

#[tokio::test]
async fn unknown_user_gets_same_error_as_wrong_password() {
    let (app, _) = test_app(test_config());
    let response = app
        .oneshot(post_json(
            "/api/login",
            "203.0.113.7",
            json!({ "username": "nobody", "password": "whatever" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn empty_fields_fail_validation() {
    let (app, ledger) = test_app(test_config());
    let response = app
        .oneshot(post_json(
            "/api/login",
            "203.0.113.8",
            json!({ "username": "", "password": "x" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid input");
    assert!(body["details"]["username"].is_array());

    // Validation failures never reach the ledger.
    assert!(ledger.recent_attempts(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_field_body_fails_validation() {
    let (app, ledger) = test_app(test_config());
    let response = app
        .oneshot(post_json(
            "/api/login",
            "203.0.113.9",
            json!({ "username": "alice" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid input");
    assert!(body["details"].as_str().unwrap().contains("password"));

    assert!(ledger.recent_attempts(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn unparseable_body_fails_validation() {
    let (app, _) = test_app(test_config());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/login")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", "203.0.113.10")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid input");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn high_risk_login_is_blocked_despite_valid_password() {
    let (app, ledger) = test_app(test_config());
    register(&app, "alice", "correct horse").await;

    // A credential-stuffing burst: many fresh failures from one
    // address drives the score past the block threshold.
    for i in 0..12 {
        ledger
            .record_attempt(NewLoginAttempt {
                username: format!("victim{i}"),
                address: "198.51.100.9".to_string(),
                user_agent: None,
                location: None,
                risk_score: 0.5,
                success: false,
                blocked: false,
            })
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/login",
            "198.51.100.9",
            json!({ "username": "alice", "password": "correct horse" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Login blocked");
    assert_eq!(body["message"], "High risk login detected");
    let score = body["riskScore"].as_f64().unwrap();
    assert!(score >= 0.7);

    // The blocked attempt itself is recorded, unsuccessful.
    let attempts = ledger.attempts_by_username("alice", 10).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(attempts[0].blocked);
    assert!(!attempts[0].success);
    assert!((attempts[0].risk_score - score).abs() < 1e-9);
}

#[tokio::test]
async fn login_rate_limit_rejects_over_budget_requests() {
    let config = Config {
        login_max_requests: 3,
        ..test_config()
    };
    let (app, ledger) = test_app(config);

    let mut statuses = Vec::new();
    for _ in 0..4 {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/login",
                "198.51.100.20",
                json!({ "username": "alice", "password": "x" }),
            ))
            .await
            .unwrap();
        statuses.push(response.status());
        if statuses.last() == Some(&StatusCode::TOO_MANY_REQUESTS) {
            let body = body_json(response).await;
            assert_eq!(body["error"], "Too many login attempts");
            let retry_after = body["retryAfter"].as_u64().unwrap();
            assert!(retry_after <= 15 * 60);
        }
    }

    // Exactly one 429, and it is the last request.
    let limited: Vec<_> = statuses
        .iter()
        .filter(|s| **s == StatusCode::TOO_MANY_REQUESTS)
        .collect();
    assert_eq!(limited.len(), 1);
    assert_eq!(statuses[3], StatusCode::TOO_MANY_REQUESTS);

    // The rejected request left no ledger record.
    assert_eq!(ledger.recent_attempts(10).await.unwrap().len(), 3);

    // A different address is unaffected.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/login",
            "198.51.100.21",
            json!({ "username": "alice", "password": "x" }),
        ))
        .await
        .unwrap();
    assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn load_test_mode_disables_limiters() {
    let config = Config {
        load_test_mode: true,
        login_max_requests: 1,
        api_max_requests: 1,
        ..Config::default()
    };
    let (app, _) = test_app(config);

    for _ in 0..10 {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/login",
                "198.51.100.30",
                json!({ "username": "alice", "password": "x" }),
            ))
            .await
            .unwrap();
        assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}

#[tokio::test]
async fn read_endpoints_require_a_token() {
    let (app, _) = test_app(test_config());

    for uri in ["/api/login-attempts", "/api/anomaly-stats", "/api/metrics"] {
        let response = app
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    let response = app
        .oneshot(get_authed("/api/login-attempts", "192.0.2.2", "garbage"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn attempt_list_is_newest_first_and_bounded() {
    let (app, ledger) = test_app(test_config());
    let token = register(&app, "admin", "s3cret").await;

    let base = chrono::Utc::now() - chrono::Duration::minutes(10);
    for i in 0..5 {
        ledger
            .record_attempt_at(
                NewLoginAttempt {
                    username: format!("user{i}"),
                    address: "10.0.0.1".to_string(),
                    user_agent: None,
                    location: None,
                    risk_score: 0.1,
                    success: true,
                    blocked: false,
                },
                base + chrono::Duration::minutes(i),
            )
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(get_authed("/api/login-attempts?limit=3", "192.0.2.2", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let attempts = body.as_array().unwrap();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[0]["username"], "user4");
    assert!(attempts[0]["riskScore"].is_number());
}

#[tokio::test]
async fn detection_rate_counts_high_risk_failures() {
    let (app, ledger) = test_app(test_config());
    let token = register(&app, "admin", "s3cret").await;

    // 10 failed attempts, 3 scored at or above the block threshold.
    for i in 0..10 {
        ledger
            .record_attempt(NewLoginAttempt {
                username: "target".to_string(),
                address: "10.0.0.2".to_string(),
                user_agent: None,
                location: None,
                risk_score: if i < 3 { 0.85 } else { 0.1 },
                success: false,
                blocked: i < 3,
            })
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(get_authed("/api/anomaly-stats", "192.0.2.2", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 10);
    assert_eq!(body["detected"], 3);
    assert!((body["detectionRate"].as_f64().unwrap() - 30.0).abs() < 1e-9);
}

#[tokio::test]
async fn metrics_rollup_reports_sessions_and_blocks() {
    let (app, ledger) = test_app(test_config());
    let token = register(&app, "admin", "s3cret").await;

    for (success, blocked, score) in [(true, false, 0.1), (true, false, 0.2), (false, true, 0.9)] {
        ledger
            .record_attempt(NewLoginAttempt {
                username: "someone".to_string(),
                address: "10.0.0.3".to_string(),
                user_agent: None,
                location: None,
                risk_score: score,
                success,
                blocked,
            })
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(get_authed("/api/metrics", "192.0.2.2", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["activeSessions"], 2);
    assert_eq!(body["threatsBlocked"], 1);
    assert_eq!(body["totalAnomalies"], 1);
    assert_eq!(body["detectedAnomalies"], 1);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (app, _) = test_app(test_config());
    register(&app, "alice", "pw").await;

    let response = app
        .oneshot(post_json(
            "/api/register",
            "192.0.2.1",
            json!({ "username": "alice", "password": "pw2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Username already exists");
}
