mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    middleware::from_fn_with_state,
    routing::get,
};
use bank_portal::{
    auth::Role,
    config::Config,
    middleware::{RateLimiter, RequestCancellation, rate_limit},
    result::error_codes,
    router::with_request_pipeline,
};
use common::{Harness, body_json, json_request, send, test_config};
use serde_json::json;
use tokio::sync::{Mutex, oneshot};

fn get_request(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, bearer);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let h = Harness::new();
    let response = send(h.router(), get_request("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["code"], error_codes::SUCCESS);
    assert_eq!(body["resp_data"]["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() {
    let h = Harness::new();

    let response = send(h.router(), get_request("/bank-info/37", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], error_codes::AUTH_FAILED);

    let response = send(
        h.router(),
        get_request("/bank-info/37", Some("Bearer not.a.jwt")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let refresh = h.tokens.issue_refresh_token(1).unwrap();
    let response = send(
        h.router(),
        get_request("/bank-info/37", Some(&format!("Bearer {refresh}"))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn authenticated_bank_lookup_returns_formatted_bank() {
    let h = Harness::new();
    h.seed_bank(37, "FIRST NATIONAL", Some("PG1")).await;
    let bearer = h.bearer(1, Role::Regular);

    let response = send(h.router(), get_request("/bank-info/37", Some(&bearer))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["resp_data"]["bank_id"], 37);
    assert_eq!(body["resp_data"]["name"], "First National");

    let response = send(h.router(), get_request("/bank-info/404", Some(&bearer))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], error_codes::NOT_FOUND);
}

#[tokio::test]
async fn elevated_routes_reject_other_roles() {
    let h = Harness::new();
    let request = |bearer: &str| {
        let mut req = json_request("POST", "/confirm-bank", json!({ "bank_id": 37 }));
        req.headers_mut()
            .insert(header::AUTHORIZATION, bearer.parse().unwrap());
        req
    };

    let response = send(h.router(), request(&h.bearer(1, Role::Admin))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["code"],
        error_codes::PERMISSION_DENIED
    );

    let response = send(h.router(), request(&h.bearer(1, Role::Regular))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        h.router(),
        json_request("POST", "/confirm-bank", json!({ "bank_id": 37 })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn options_requests_are_answered_directly() {
    let h = Harness::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/update-profile")
        .body(Body::empty())
        .unwrap();

    let response = send(h.router(), request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn signup_verify_and_login_over_http() {
    let h = Harness::new();

    let response = send(
        h.router(),
        json_request(
            "POST",
            "/elevated-user",
            json!({ "email": "e@x.com", "password": "Passw0rd!" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["resp_data"]["verification_email_sent"], true);

    let token = h.mailer.last_token_for("e@x.com").await.unwrap();
    let response = send(
        h.router(),
        get_request(&format!("/verify-email?token={token}"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        h.router(),
        json_request(
            "POST",
            "/login",
            json!({ "email": "e@x.com", "password": "Passw0rd!" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["resp_data"]["message"],
        "profile incomplete. Please update your profile details."
    );

    let response = send(
        h.router(),
        json_request(
            "POST",
            "/complete-profile",
            json!({
                "email": "e@x.com",
                "password": "Passw0rd!",
                "first_name": "John",
                "last_name": "Doe",
                "phone_number": "1234567890",
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let access = body["resp_data"]["token"].as_str().unwrap();
    assert_eq!(h.tokens.validate_token(access).unwrap().role, Role::Elevated);
}

#[tokio::test]
async fn duplicate_signup_and_bad_login_use_fixed_codes() {
    let h = Harness::new();
    let signup = || {
        json_request(
            "POST",
            "/elevated-user",
            json!({ "email": "e@x.com", "password": "Passw0rd!" }),
        )
    };
    assert_eq!(send(h.router(), signup()).await.status(), StatusCode::OK);

    let response = send(h.router(), signup()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], error_codes::USER_EXISTS);

    let response = send(
        h.router(),
        json_request(
            "POST",
            "/login",
            json!({ "email": "e@x.com", "password": "Wrong-Passw0rd" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["code"], error_codes::AUTH_FAILED);
    assert_eq!(body["msg"], "unauthorized");
}

#[tokio::test]
async fn resend_within_cooldown_is_throttled() {
    let h = Harness::new();
    send(
        h.router(),
        json_request(
            "POST",
            "/elevated-user",
            json!({ "email": "e@x.com", "password": "Passw0rd!" }),
        ),
    )
    .await;

    let response = send(
        h.router(),
        json_request(
            "POST",
            "/resend-verification-email",
            json!({ "email": "e@x.com" }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "300");
}

#[tokio::test]
async fn rate_limit_without_deadline_rejects_past_the_burst() {
    let limiter = Arc::new(RateLimiter::new(1, 2));
    let router = Router::new()
        .route("/ping", get(|| async { "pong" }))
        .layer(from_fn_with_state(limiter, rate_limit));

    for _ in 0..2 {
        let response = send(router.clone(), get_request("/ping", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = send(router, get_request("/ping", None)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(body_json(response).await["code"], error_codes::RATE_LIMIT);
}

#[tokio::test]
async fn pipeline_waits_for_a_token_inside_the_deadline() {
    let config = Config {
        rate_limit_per_second: 20,
        burst_size: 1,
        ..test_config()
    };
    let h = Harness::with_config(config);
    let router = h.router();

    for _ in 0..3 {
        let response = send(router.clone(), get_request("/health", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn slow_handler_times_out_and_is_cancelled() {
    let config = Config {
        request_timeout_secs: 1,
        ..test_config()
    };
    let (cancelled_tx, cancelled_rx) = oneshot::channel::<()>();
    let cancelled_tx = Arc::new(Mutex::new(Some(cancelled_tx)));

    let router = Router::new().route(
        "/slow",
        get(move |RequestCancellation(cancel): RequestCancellation| {
            let cancelled_tx = Arc::clone(&cancelled_tx);
            async move {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        if let Some(tx) = cancelled_tx.lock().await.take() {
                            let _ = tx.send(());
                        }
                    }
                    _ = tokio::time::sleep(Duration::from_secs(30)) => {}
                }
                "done"
            }
        }),
    );
    let limiter = Arc::new(RateLimiter::from_config(&config));
    let router = with_request_pipeline(router, &config, limiter);

    let response = send(router, get_request("/slow", None)).await;
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body_json(response).await["code"], error_codes::TIMEOUT);

    tokio::time::timeout(Duration::from_secs(2), cancelled_rx)
        .await
        .expect("handler observed cancellation")
        .unwrap();
}

async fn explode() -> &'static str {
    panic!("handler exploded")
}

#[tokio::test]
async fn panicking_handler_becomes_internal_error() {
    let config = test_config();
    let router = Router::new().route("/explode", get(explode));
    let limiter = Arc::new(RateLimiter::from_config(&config));
    let router = with_request_pipeline(router, &config, limiter);

    let response = send(router.clone(), get_request("/explode", None)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["code"], error_codes::INTERNAL_ERROR);
    assert_eq!(body["msg"], "internal server error");

    // the process keeps serving after a panic
    let response = send(router, get_request("/missing", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
