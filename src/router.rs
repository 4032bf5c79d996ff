use std::sync::Arc;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower::ServiceBuilder;

use crate::{
    AppState,
    auth::Role,
    config::Config,
    middleware::{
        RateLimiter, cors_layer, enforce_timeout, log_requests, rate_limit, recover,
        require_auth, require_role, short_circuit_options,
    },
    routes,
};

/// Full application: routes, per-route auth and role gates, and the shared pipeline.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route("/login", post(routes::session::login))
        .route("/refresh-token", post(routes::session::refresh_token))
        .route("/elevated-user", post(routes::account::create_elevated_user))
        .route("/complete-profile", post(routes::account::complete_profile))
        .route("/verify-email", get(routes::account::verify_email))
        .route(
            "/resend-verification-email",
            post(routes::account::resend_verification_email),
        );

    let elevated_routes = Router::new()
        .route("/confirm-bank", post(routes::bank::confirm_bank))
        .route("/shared-account", post(routes::account::create_shared_account))
        .route_layer(from_fn_with_state(Role::Elevated, require_role));

    // route_layer added last runs first: auth before the role gate
    let protected_routes = Router::new()
        .route("/update-profile", post(routes::account::update_profile))
        .route("/bank-info/{query}", get(routes::bank::bank_info))
        .merge(elevated_routes)
        .route_layer(from_fn_with_state(Arc::clone(&state.tokens), require_auth));

    let router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state.clone());

    with_request_pipeline(router, &state.config, Arc::clone(&state.limiter))
}

/// Wraps `router` in logging, CORS, recovery, timeout and rate limiting, outermost first.
pub fn with_request_pipeline(router: Router, config: &Config, limiter: Arc<RateLimiter>) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(from_fn(log_requests))
            .layer(cors_layer(&config.allowed_origin))
            .layer(from_fn(short_circuit_options))
            .layer(from_fn(recover))
            .layer(from_fn_with_state(config.request_timeout(), enforce_timeout))
            .layer(from_fn_with_state(limiter, rate_limit)),
    )
}
