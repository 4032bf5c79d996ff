use axum::{
    body::Body,
    http::{HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// CORS headers for `allowed_origin`, or any origin when it is `*`.
pub fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let origin = if allowed_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        match HeaderValue::from_str(allowed_origin.trim()) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!(allowed_origin, "invalid ALLOWED_ORIGIN, allowing any origin");
                AllowOrigin::any()
            }
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Answers every `OPTIONS` request with 200 before it reaches the later stages.
pub async fn short_circuit_options(req: Request<Body>, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(req).await
}
